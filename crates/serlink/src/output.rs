use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serlink_frame::Frame;

#[derive(Clone, Debug, Copy, ValueEnum)]
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

#[derive(Serialize)]
struct FrameOutput<'a> {
    port: &'a str,
    size: usize,
    declared_len: usize,
    envelope: String,
    text: String,
    checksum: u8,
    timestamp: String,
}

pub fn print_frame(frame: &Frame, port: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                port,
                size: frame.wire_size(),
                declared_len: frame.declared_len(),
                envelope: payload_preview(frame.envelope()),
                text: payload_preview(frame.text()),
                checksum: frame.checksum(),
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PORT", "SIZE", "ENVELOPE", "TEXT"])
                .add_row(vec![
                    port.to_string(),
                    frame.wire_size().to_string(),
                    payload_preview(frame.envelope()),
                    payload_preview(frame.text()),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "port={} size={} envelope={} lrc={:#04x} text={}",
                port,
                frame.wire_size(),
                payload_preview(frame.envelope()),
                frame.checksum(),
                payload_preview(frame.text())
            );
        }
        OutputFormat::Raw => {
            print_raw(frame.text());
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
