//! Output formatting for CLI commands.
//!
//! Human-readable tables and status lines on stdout. Raw item bytes
//! (`read --type`) bypass this module so piping works naturally.

use std::path::Path;

use clipbridge::ClipboardItem;

/// Widest text preview shown in the item table.
const PREVIEW_CHARS: usize = 40;

/// Print items as a table to stdout.
pub fn print_items(items: &[ClipboardItem]) {
    if items.is_empty() {
        println!("Clipboard is empty");
        return;
    }

    println!("{:<4} {:<12} {:>10} PREVIEW", "#", "TYPE", "SIZE");
    println!("{}", "-".repeat(70));
    for (i, item) in items.iter().enumerate() {
        println!(
            "{:<4} {:<12} {:>10} {}",
            i,
            item.kind(),
            item.data().len(),
            preview(item),
        );
    }
}

/// Print the backend's capabilities.
pub fn print_types(backend: &str, types: &[&str], max_items: usize) {
    let limit = if max_items == usize::MAX {
        "unlimited".to_string()
    } else {
        max_items.to_string()
    };
    println!("Backend:   {backend}");
    println!("Max items: {limit}");
    for kind in types {
        println!("  {kind}");
    }
}

pub fn print_written(count: usize) {
    println!("Wrote {count} item(s) to the clipboard");
}

pub fn print_dumped(path: &Path, count: usize) {
    println!("Saved {count} item(s) to {}", path.display());
}

/// One-line preview: leading text for `text/*` types, `-` otherwise.
fn preview(item: &ClipboardItem) -> String {
    if !item.kind().starts_with("text/") {
        return "-".to_string();
    }
    let text = String::from_utf8_lossy(item.data());
    let line = text.lines().next().unwrap_or("");
    let mut out: String = line.chars().take(PREVIEW_CHARS).collect();
    if line.chars().count() > PREVIEW_CHARS || text.lines().nth(1).is_some() {
        out.push_str("...");
    }
    out
}
