//! Subcommand handlers

use crate::cli::{BuildArgs, OutputFormat};
use crate::ingest;
use anyhow::{Context, Result};
use pagetree::dot::to_dot;
use pagetree::{BuildConfig, Key, PagedIndex, build_index_file_with_config, open_index};
use serde_json::json;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;
use tracing::info;

fn open(path: &Path) -> Result<PagedIndex<File>> {
    open_index(path).with_context(|| format!("Failed to open index {}", path.display()))
}

/// Load the build configuration, letting `--capacity` override the file
pub fn load_config(args: &BuildArgs) -> Result<BuildConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => BuildConfig::default(),
    };
    if let Some(capacity) = args.capacity {
        config = config.with_capacity(capacity);
    }
    config.validate()?;
    Ok(config)
}

pub fn build(args: &BuildArgs, format: OutputFormat) -> Result<ExitCode> {
    let config = load_config(args)?;
    let rows = ingest::read_rows_from_path(&args.input, args.has_headers)?;
    let meta = args.meta.join("\n");

    info!(
        input = %args.input.display(),
        rows = rows.len(),
        capacity = config.capacity,
        "Building index"
    );
    let summary = build_index_file_with_config(&args.output, rows, meta.as_bytes(), &config)
        .with_context(|| format!("Failed to build {}", args.output.display()))?;

    match format {
        OutputFormat::Text => {
            println!("Wrote {}", args.output.display());
            println!("  entries:     {}", summary.entry_count);
            println!("  pages:       {}", summary.page_count);
            println!("  depth:       {}", summary.depth);
            println!("  root offset: {}", summary.root_offset);
        }
        OutputFormat::Json => println!(
            "{}",
            json!({
                "output": args.output,
                "entries": summary.entry_count,
                "pages": summary.page_count,
                "depth": summary.depth,
                "root_offset": summary.root_offset,
                "pages_per_level": summary.pages_per_level,
            })
        ),
    }
    Ok(ExitCode::SUCCESS)
}

pub fn get(path: &Path, key: Key, format: OutputFormat) -> Result<ExitCode> {
    let index = open(path)?;
    let found = index.search(key)?;

    match (format, found) {
        (OutputFormat::Text, Some(payload)) => {
            println!("{key},{},{}", payload.data, payload.aux);
        }
        (OutputFormat::Text, None) => eprintln!("{key}: not found"),
        (OutputFormat::Json, found) => {
            println!("{}", json!({ "key": key, "payload": found }));
        }
    }

    Ok(if found.is_some() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

pub fn range(path: &Path, min: Key, max: Key, format: OutputFormat) -> Result<ExitCode> {
    let index = open(path)?;
    let stdout = io::stdout().lock();

    match format {
        OutputFormat::Text => {
            let mut writer = csv::Writer::from_writer(stdout);
            for entry in index.range_iter(min, max) {
                let (key, payload) = entry?;
                writer.write_record([
                    key.to_string(),
                    payload.data.to_string(),
                    payload.aux.to_string(),
                ])?;
            }
            writer.flush()?;
        }
        OutputFormat::Json => {
            let entries: Vec<_> = index
                .range(min, max)?
                .into_iter()
                .map(|(key, payload)| json!({ "key": key, "payload": payload }))
                .collect();
            let mut stdout = stdout;
            serde_json::to_writer(&mut stdout, &entries)?;
            writeln!(stdout)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub fn info(path: &Path, format: OutputFormat) -> Result<ExitCode> {
    let index = open(path)?;

    match format {
        OutputFormat::Text => {
            println!("File:        {}", path.display());
            println!("Capacity:    {}", index.capacity());
            println!("Entries:     {}", index.entry_count());
            println!("Pages:       {}", index.page_count());
            println!("Depth:       {}", index.depth());
            println!("Page size:   {} bytes", index.page_len());
            println!("Data start:  {}", index.data_start());
            println!("Root offset: {}", index.root_offset());
            for line in index.meta_lines() {
                println!("Meta:        {line}");
            }
        }
        OutputFormat::Json => println!(
            "{}",
            json!({
                "file": path,
                "capacity": index.capacity(),
                "entries": index.entry_count(),
                "pages": index.page_count(),
                "depth": index.depth(),
                "page_len": index.page_len(),
                "data_start": index.data_start(),
                "root_offset": index.root_offset(),
                "meta": index.meta_lines(),
            })
        ),
    }
    Ok(ExitCode::SUCCESS)
}

pub fn verify(path: &Path, format: OutputFormat) -> Result<ExitCode> {
    let index = open(path)?;
    let report = index
        .verify()
        .with_context(|| format!("Index {} failed verification", path.display()))?;

    match format {
        OutputFormat::Text => {
            println!("OK: {}", path.display());
            println!("  depth:           {}", report.depth);
            println!("  pages per level: {:?}", report.pages_per_level);
            println!("  entries:         {}", report.entry_count);
            if let (Some(min), Some(max)) = (report.min_key, report.max_key) {
                println!("  key range:       {min}..={max}");
            }
        }
        OutputFormat::Json => println!(
            "{}",
            json!({
                "file": path,
                "depth": report.depth,
                "pages_per_level": report.pages_per_level,
                "pages": report.page_count,
                "entries": report.entry_count,
                "min_key": report.min_key,
                "max_key": report.max_key,
            })
        ),
    }
    Ok(ExitCode::SUCCESS)
}

pub fn dot(path: &Path, depth: Option<usize>) -> Result<ExitCode> {
    let index = open(path)?;
    print!("{}", to_dot(&index, depth)?);
    Ok(ExitCode::SUCCESS)
}
