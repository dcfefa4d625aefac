use std::io::IsTerminal;
use std::time::Duration;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serialcast_pipeline::StatsSnapshot;
use serialcast_transport::PortInfo;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
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

#[derive(Debug, Serialize, PartialEq)]
pub struct SummaryOutput<'a> {
    pub device: &'a str,
    pub group: &'a str,
    pub uptime_secs: f64,
    pub frames_read: u64,
    pub frames_discarded: u64,
    pub read_errors: u64,
    pub frames_enqueued: u64,
    pub frames_rejected: u64,
    pub frames_published: u64,
    pub send_errors: u64,
}

impl<'a> SummaryOutput<'a> {
    pub fn new(device: &'a str, group: &'a str, uptime: Duration, stats: &StatsSnapshot) -> Self {
        Self {
            device,
            group,
            uptime_secs: (uptime.as_secs_f64() * 1000.0).round() / 1000.0,
            frames_read: stats.frames_read,
            frames_discarded: stats.frames_discarded,
            read_errors: stats.read_errors,
            frames_enqueued: stats.frames_enqueued,
            frames_rejected: stats.frames_rejected,
            frames_published: stats.frames_published,
            send_errors: stats.send_errors,
        }
    }

    fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("device", self.device.to_string()),
            ("group", self.group.to_string()),
            ("uptime", format!("{:.3}s", self.uptime_secs)),
            ("frames read", self.frames_read.to_string()),
            ("frames discarded", self.frames_discarded.to_string()),
            ("read errors", self.read_errors.to_string()),
            ("frames enqueued", self.frames_enqueued.to_string()),
            ("frames rejected", self.frames_rejected.to_string()),
            ("frames published", self.frames_published.to_string()),
            ("send errors", self.send_errors.to_string()),
        ]
    }
}

pub fn print_summary(summary: &SummaryOutput<'_>, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(summary).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["METRIC", "VALUE"]);
            for (name, value) in summary.rows() {
                table.add_row(vec![name.to_string(), value]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "device={} group={} uptime={:.3}s read={} published={} read_errors={} send_errors={} rejected={}",
                summary.device,
                summary.group,
                summary.uptime_secs,
                summary.frames_read,
                summary.frames_published,
                summary.read_errors,
                summary.send_errors,
                summary.frames_rejected
            );
        }
    }
}

#[derive(Serialize)]
struct PortOutput<'a> {
    name: &'a str,
    kind: &'a str,
}

pub fn print_ports(ports: &[PortInfo], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out: Vec<PortOutput<'_>> = ports
                .iter()
                .map(|p| PortOutput {
                    name: &p.name,
                    kind: &p.kind,
                })
                .collect();
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "[]".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PORT", "TYPE"]);
            for port in ports {
                table.add_row(vec![port.name.clone(), port.kind.clone()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for port in ports {
                println!("{} ({})", port.name, port.kind);
            }
        }
    }
}
