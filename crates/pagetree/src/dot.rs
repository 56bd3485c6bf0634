//! Render the page tree as a GraphViz `digraph`
//!
//! Each page becomes a record node labelled with its offset and slot keys;
//! each reference slot becomes an edge to its child page. Rendering only
//! reads pages, so it can run alongside queries on the same handle.

use crate::error::IndexResult;
use crate::page::Page;
use crate::reader::{PageSource, PagedIndex};
use std::fmt::Write;

/// Render `index` as GraphViz source
///
/// `max_depth` limits the number of levels drawn, counting the root as the
/// first level; `None` draws the whole tree.
pub fn to_dot<S: PageSource>(
    index: &PagedIndex<S>,
    max_depth: Option<usize>,
) -> IndexResult<String> {
    let mut out = String::from("digraph pagetree {\n    node [shape=record];\n");
    let limit = max_depth.unwrap_or(usize::MAX);

    let mut level = if index.is_empty() || limit == 0 {
        Vec::new()
    } else {
        vec![index.root_offset()]
    };
    let mut depth = 1;

    while !level.is_empty() {
        let mut next = Vec::new();
        for offset in level {
            let page = index.read_page(offset)?;
            let fields: Vec<String> = match &page {
                Page::Leaf(slots) => slots
                    .iter()
                    .map(|s| format!("{}: {}/{}", s.key, s.payload.data, s.payload.aux))
                    .collect(),
                Page::Reference(slots) => slots
                    .iter()
                    .enumerate()
                    .map(|(i, s)| format!("<s{i}> {}", s.key))
                    .collect(),
            };
            let _ = writeln!(
                out,
                "    p{offset} [label=\"@{offset}|{}\"];",
                fields.join("|")
            );

            if let Page::Reference(slots) = page
                && depth < limit
            {
                for (i, slot) in slots.iter().enumerate() {
                    let child = index.child_offset(offset, slot.child)?;
                    let _ = writeln!(out, "    p{offset}:s{i} -> p{child};");
                    next.push(child);
                }
            }
        }
        level = next;
        depth += 1;
    }

    out.push_str("}\n");
    Ok(out)
}
