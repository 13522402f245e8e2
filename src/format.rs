//! Text formatting helpers shared by the tools and the CLI

use chrono::{DateTime, Local, Utc};

/// Marker appended to truncated text
pub const TRUNCATION_MARKER: &str = "...";

/// Collapse runs of whitespace into single spaces
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to at most `max_chars` characters, appending `...` when cut
pub fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}{}", &text[..idx], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

/// Bulleted list, optionally capped with an "and N more" line
pub fn format_list<S: AsRef<str>>(items: &[S], max_items: Option<usize>) -> String {
    if items.is_empty() {
        return "No items".to_string();
    }

    let shown = max_items.unwrap_or(items.len()).min(items.len());
    let mut lines: Vec<String> = items[..shown]
        .iter()
        .map(|item| format!("- {}", item.as_ref()))
        .collect();

    if shown < items.len() {
        lines.push(format!("... and {} more items", items.len() - shown));
    }

    lines.join("\n")
}

/// Left-aligned markdown table
pub fn format_table<S: AsRef<str>>(headers: &[&str], rows: &[Vec<S>]) -> String {
    if headers.is_empty() || rows.is_empty() {
        return "Empty table".to_string();
    }

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            rows.iter()
                .filter_map(|row| row.get(i))
                .map(|cell| cell.as_ref().chars().count())
                .max()
                .unwrap_or(0)
                .max(header.chars().count())
        })
        .collect();

    let mut out = vec![
        table_row(headers, &widths),
        table_row(&vec![":--"; headers.len()], &widths),
    ];
    for row in rows {
        let cells: Vec<&str> = (0..headers.len())
            .map(|i| row.get(i).map_or("", |c| c.as_ref()))
            .collect();
        out.push(table_row(&cells, &widths));
    }

    out.join("\n")
}

fn table_row(cells: &[&str], widths: &[usize]) -> String {
    let body = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!(" {:<width$} ", cell, width = *width))
        .collect::<Vec<_>>()
        .join("|");
    format!("|{}|", body)
}

/// Local-time display of a UTC timestamp
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}
