use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use devxobj_object::{ChannelConfig, FieldDiff, Syndrome};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Serializable view of a classified syndrome.
#[derive(Serialize)]
pub struct SyndromeReport {
    pub raw_code: String,
    pub category: &'static str,
    pub description: &'static str,
    pub status: String,
    pub status_byte: u8,
    pub probable_causes: &'static [&'static str],
}

impl From<&Syndrome> for SyndromeReport {
    fn from(syndrome: &Syndrome) -> Self {
        Self {
            raw_code: format!("{:#x}", syndrome.raw_code),
            category: syndrome.category.as_str(),
            description: syndrome.category.description(),
            status: format!("{:?}", syndrome.status),
            status_byte: syndrome.status.as_byte(),
            probable_causes: syndrome.category.probable_causes(),
        }
    }
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

/// Two-column FIELD / VALUE table.
pub fn field_table(rows: &[(&str, String)]) -> Table {
    let mut table = new_table(vec!["FIELD", "VALUE"]);
    for (field, value) in rows {
        table.add_row(vec![field.to_string(), value.clone()]);
    }
    table
}

pub fn config_rows(config: &ChannelConfig) -> Vec<(&'static str, String)> {
    vec![
        ("protocol_mode", config.protocol_mode.to_string()),
        ("queue_size", config.queue_size.to_string()),
        ("queue_address", format!("{:#x}", config.queue_address)),
        ("memory_key", format!("{:#x}", config.memory_key)),
        ("stride_index", config.stride_index.to_string()),
    ]
}

pub fn diff_table(diffs: &[FieldDiff]) -> Table {
    let mut table = new_table(vec!["FIELD", "EXPECTED", "ACTUAL"]);
    for diff in diffs {
        table.add_row(vec![
            diff.field.to_string(),
            format!("{:#x}", diff.expected),
            format!("{:#x}", diff.actual),
        ]);
    }
    table
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

pub fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Offset-prefixed dump, 16 bytes per line, grouped in 32-bit words.
pub fn hex_dump(bytes: &[u8]) -> String {
    bytes
        .chunks(16)
        .enumerate()
        .map(|(line, chunk)| {
            let words = chunk.chunks(4).map(hex).collect::<Vec<_>>().join(" ");
            format!("{:04x}: {words}", line * 16)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_is_lowercase_contiguous() {
        assert_eq!(hex(&[0x0a, 0x00, 0xff]), "0a00ff");
    }

    #[test]
    fn hex_dump_groups_words() {
        let bytes: Vec<u8> = (0u8..20).collect();
        let dump = hex_dump(&bytes);
        let lines: Vec<_> = dump.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "0000: 00010203 04050607 08090a0b 0c0d0e0f");
        assert_eq!(lines[1], "0010: 10111213");
    }

    #[test]
    fn syndrome_report_fields() {
        let report = SyndromeReport::from(&Syndrome::new(0x03, 0xE1E102));
        assert_eq!(report.raw_code, "0xe1e102");
        assert_eq!(report.category, "invalid_queue_size");
        assert_eq!(report.status, "BadParam");
        assert!(report.probable_causes.is_empty());
    }
}
