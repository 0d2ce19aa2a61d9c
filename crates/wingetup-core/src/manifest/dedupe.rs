use std::collections::HashSet;

use tracing::warn;

use super::indent_of;

/// Drop repeated keys that share a context.
///
/// Contexts are one installer block (per architecture entry), one list
/// item, one section at a given indent, or the top level. A list item owns
/// every following line indented deeper than its dash, so repeated keys in
/// sibling items (`NestedInstallerFiles`, `Documentations`) are kept. Block
/// scalar bodies (`|`, `>`) are passed through untouched.
pub fn remove_duplicate_fields(content: &str) -> String {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut out: Vec<&str> = Vec::new();
    let mut section: Option<&str> = None;
    let mut in_installers = false;
    let mut arch: Option<&str> = None;
    let mut block = 0usize;
    // Open list items as (dash indent, line index), innermost last.
    let mut items: Vec<(usize, usize)> = Vec::new();
    let mut scalar_indent: Option<usize> = None;
    let mut removed = 0usize;

    for (idx, line) in content.split('\n').enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            out.push(line);
            continue;
        }

        let indent = indent_of(line);
        if let Some(owner) = scalar_indent {
            if indent > owner {
                out.push(line);
                continue;
            }
            scalar_indent = None;
        }

        while items.last().is_some_and(|&(dash, _)| indent <= dash) {
            items.pop();
        }

        if trimmed == "Installers:" && indent == 0 {
            in_installers = true;
            section = Some("Installers");
            arch = None;
            out.push(line);
            continue;
        }

        let Some((key, value)) = trimmed.split_once(':') else {
            out.push(line);
            continue;
        };
        let is_item = trimmed.starts_with("- ");
        let field = key.trim_start_matches(['-', ' ']).trim();
        let value = value.trim();
        if value.starts_with('|') || value.starts_with('>') {
            scalar_indent = Some(indent);
        }

        if in_installers && is_item && field == "Architecture" {
            block += 1;
            arch = Some(value);
            items.clear();
            out.push(line);
            continue;
        }

        if indent == 0 && !is_item {
            in_installers = false;
            arch = None;
            section = Some(field);
        }

        // Column of the key itself, past any "- " marker.
        let column = indent + (key.len() - field.len());
        if is_item {
            items.push((indent, idx));
        }

        let context = match (items.last(), in_installers, arch) {
            (Some((dash, start)), ..) => format!("list_item:{dash}:{start}:{column}"),
            (None, true, Some(a)) => format!("arch_block:{block}:{a}:{indent}"),
            _ => match section {
                Some(s) => format!("section:{s}:{indent}"),
                None => format!("top:{indent}"),
            },
        };

        if seen.insert((context.clone(), field.to_string())) {
            out.push(line);
        } else {
            warn!("removed duplicate '{field}' in {context}");
            removed += 1;
        }
    }

    if removed == 0 {
        return content.to_string();
    }
    collapse_blank_lines(&out.join("\n"))
}

/// Collapse runs of two or more blank lines into one empty line.
pub fn collapse_blank_lines(content: &str) -> String {
    let lines: Vec<&str> = content.split('\n').collect();
    let mut out: Vec<&str> = Vec::with_capacity(lines.len());
    let mut i = 0;

    while i < lines.len() {
        if lines[i].trim().is_empty() {
            let start = i;
            while i < lines.len() && lines[i].trim().is_empty() {
                i += 1;
            }
            // A trailing "" is the final newline, not a blank line.
            let run_end = if i == lines.len() { i - 1 } else { i };
            match run_end.saturating_sub(start) {
                0 => {}
                1 => out.push(lines[start]),
                _ => out.push(""),
            }
            if i == lines.len() {
                out.push("");
            }
            continue;
        }
        out.push(lines[i]);
        i += 1;
    }

    out.join("\n")
}
