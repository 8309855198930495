//! Section editing on markdown documents held in memory.
//!
//! A section runs from its heading line to the next `## ` heading (or end of
//! document). Output always uses `\n` line endings and ends with a newline.

fn split_lines(doc: &str) -> Vec<String> {
    doc.replace("\r\n", "\n").lines().map(str::to_string).collect()
}

fn join_lines(lines: &[String]) -> String {
    if lines.is_empty() {
        return String::new();
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// `(heading_index, end_exclusive)` of the first section whose heading matches
fn section_bounds(lines: &[String], heading: &str) -> Option<(usize, usize)> {
    let start = lines.iter().position(|l| l.trim() == heading)?;
    let end = lines[start + 1..]
        .iter()
        .position(|l| l.starts_with("## "))
        .map(|offset| start + 1 + offset)
        .unwrap_or(lines.len());
    Some((start, end))
}

/// Append `heading` after one blank line unless some line already equals it (trimmed)
pub fn ensure_section(doc: &str, heading: &str) -> String {
    let heading = heading.trim();
    if doc.lines().any(|l| l.trim() == heading) {
        return doc.to_string();
    }

    let body = doc.trim_end();
    if body.is_empty() {
        format!("{}\n", heading)
    } else {
        format!("{}\n\n{}\n", body, heading)
    }
}

/// Insert `line` at the end of the section, ahead of any blank lines that
/// separate it from the next `## ` heading. Creates the section if missing.
pub fn append_line_to_section(doc: &str, heading: &str, line: &str) -> String {
    let heading = heading.trim();
    let doc = ensure_section(doc, heading);
    let mut lines = split_lines(&doc);

    let Some((start, end)) = section_bounds(&lines, heading) else {
        return doc;
    };
    let last_content = (start..end)
        .rev()
        .find(|&idx| !lines[idx].trim().is_empty())
        .unwrap_or(start);

    lines.insert(last_content + 1, line.to_string());
    join_lines(&lines)
}

/// Parse `- key: value` into `(key, value)`; the value may be empty
pub fn parse_tracking_line(line: &str) -> Option<(&str, &str)> {
    let item = line.trim_start().strip_prefix("- ")?;
    let (key, value) = item.split_once(':')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, value.trim()))
}

pub fn format_tracking_line(key: &str, value: &str) -> String {
    if value.is_empty() {
        format!("- {}:", key)
    } else {
        format!("- {}: {}", key, value)
    }
}

/// Set `key` to `value` inside the section. An existing line whose key matches
/// case-insensitively is rewritten in place (keeping its spelling and indent);
/// otherwise a new line is appended to the section.
pub fn upsert_tracking_line(doc: &str, heading: &str, key: &str, value: &str) -> String {
    let heading = heading.trim();
    let key = key.trim();
    let value = value.trim();
    let doc = ensure_section(doc, heading);
    let mut lines = split_lines(&doc);

    if let Some((start, end)) = section_bounds(&lines, heading) {
        let wanted = key.to_lowercase();
        for idx in start + 1..end {
            let replacement = match parse_tracking_line(&lines[idx]) {
                Some((existing, _)) if existing.to_lowercase() == wanted => {
                    let indent_len = lines[idx].len() - lines[idx].trim_start().len();
                    format!(
                        "{}{}",
                        &lines[idx][..indent_len],
                        format_tracking_line(existing, value)
                    )
                }
                _ => continue,
            };
            lines[idx] = replacement;
            return join_lines(&lines);
        }
    }

    append_line_to_section(&doc, heading, &format_tracking_line(key, value))
}
