//! Types command

use comfy_table::{Table, presets::UTF8_FULL};
use filegate_core::signature::SIGNATURES;

fn hex_bytes(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return "-".to_string();
    }
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render the signature table.
pub fn table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Type", "Head", "Tail", "Archive"]);

    for sig in &SIGNATURES {
        table.add_row(vec![
            sig.tag.to_string(),
            hex_bytes(sig.head),
            hex_bytes(sig.tail),
            if sig.tag.is_archive() { "yes" } else { "no" }.to_string(),
        ]);
    }
    table
}

/// Print the supported signatures
pub fn types() {
    println!("{}", table());
}
