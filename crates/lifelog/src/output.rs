use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

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

/// Outcome of a completed transfer.
#[derive(Debug, Serialize)]
pub struct TransferReport {
    pub schema_id: &'static str,
    pub connection: String,
    pub steps: u32,
    pub payload_len: usize,
    pub chunks: usize,
    pub acknowledged: bool,
    pub elapsed_ms: f64,
}

/// A decoded or encoded control frame.
#[derive(Debug, Serialize)]
pub struct FrameReport {
    pub schema_id: &'static str,
    pub command: u8,
    pub command_name: &'static str,
    pub category: u8,
    pub category_name: &'static str,
    pub length: u32,
    pub hex: String,
}

pub fn print_transfer(report: &TransferReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CONNECTION", "STEPS", "BYTES", "CHUNKS", "ACK", "ELAPSED"])
                .add_row(vec![
                    report.connection.clone(),
                    report.steps.to_string(),
                    report.payload_len.to_string(),
                    report.chunks.to_string(),
                    yes_no(report.acknowledged).to_string(),
                    format!("{:.2}ms", report.elapsed_ms),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "connection={} steps={} bytes={} chunks={} ack={} elapsed={:.2}ms",
                report.connection,
                report.steps,
                report.payload_len,
                report.chunks,
                yes_no(report.acknowledged),
                report.elapsed_ms
            );
        }
        OutputFormat::Raw => print_raw_line(&report.steps.to_string()),
    }
}

pub fn print_frame(report: &FrameReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["COMMAND", "CATEGORY", "LENGTH", "HEX"])
                .add_row(vec![
                    format!("0x{:02x} ({})", report.command, report.command_name),
                    format!("0x{:02x} ({})", report.category, report.category_name),
                    report.length.to_string(),
                    report.hex.clone(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "command=0x{:02x} ({}) category=0x{:02x} ({}) length={} hex={}",
                report.command,
                report.command_name,
                report.category,
                report.category_name,
                report.length,
                report.hex
            );
        }
        OutputFormat::Raw => print_raw_line(&report.hex),
    }
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn print_raw_line(text: &str) {
    let mut out = std::io::stdout();
    let _ = writeln!(out, "{text}");
    let _ = out.flush();
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}
