//! Output rendering for the diagnostics commands
//!
//! Everything the CLI prints goes through here, as plain text lines or as
//! one JSON document per item.

use anyhow::Result;
use clap::ValueEnum;
use rt130_decoder::{LogTextSummary, Outbound, SohInfo};
use serde::Serialize;
use std::fmt::Display;

/// Output format selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Render one item either through `Display` or as JSON
pub fn render<T: Display + Serialize>(item: &T, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Text => item.to_string(),
        OutputFormat::Json => serde_json::to_string(item)?,
    })
}

/// Text line for an outbound message, prefixed with its destination
pub fn render_outbound(message: &Outbound, format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return Ok(serde_json::to_string(message)?);
    }
    Ok(match message {
        Outbound::Composite(status) => format!("STATUS  {}", status),
        Outbound::Monitoring(line) => format!(
            "MONITOR {:04X} {:<11} {}",
            line.unit,
            line.category.name(),
            line
        ),
        Outbound::Trigger(trigger) => trigger.to_string(),
    })
}

/// SOH classification report
#[derive(Debug, Serialize)]
pub struct SohReport<'a> {
    pub summary: LogTextSummary,
    pub info: &'a SohInfo,
    pub unknown: &'a [String],
}

impl SohReport<'_> {
    pub fn render(&self, format: OutputFormat) -> Result<String> {
        if format == OutputFormat::Json {
            return Ok(serde_json::to_string_pretty(self)?);
        }

        let info = self.info;
        let text = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
        let number = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());
        let mut lines = vec![
            format!(
                "Lines: {} recognized, {} benign, {} unknown, {} malformed",
                self.summary.recognized, self.summary.benign, self.summary.unknown, self.summary.malformed
            ),
            format!("Firmware:    {}", text(&info.version)),
            format!("Clock type:  {}", text(&info.clock_type)),
            format!(
                "Locked at:   {}",
                info.lock_time
                    .map(|t| format!("{:03}:{:02}:{:02}:{:02}", t.day_of_year, t.hour, t.minute, t.second))
                    .unwrap_or_else(|| "-".to_string())
            ),
            format!("Phase error: {} us", number(info.phase_error_us)),
            format!(
                "Position:    {} {} {} m",
                text(&info.latitude),
                text(&info.longitude),
                number(info.elevation_m)
            ),
            format!(
                "Power:       battery {} V, backup {} V, {} C",
                number(info.battery_volts),
                number(info.backup_volts),
                number(info.temperature_c)
            ),
            format!(
                "Memory:      used {}, available {}, total {}",
                number(info.memory_used),
                number(info.memory_available),
                number(info.memory_total)
            ),
            format!("IP:          {}", info.ip_addresses.join(" ")),
            format!("Netmask:     {}", info.netmasks.join(" ")),
            format!("Gateway:     {}", info.gateways.join(" ")),
            format!("Hosts:       {}", info.hosts.join(" ")),
        ];
        for (i, sensor) in info.sensors.iter().enumerate() {
            if let Some(ident) = sensor {
                lines.push(format!("Sensor {}:    {}", i + 1, ident));
            }
        }
        if !self.unknown.is_empty() {
            lines.push("Unknown lines:".to_string());
            lines.extend(self.unknown.iter().map(|l| format!("  {}", l)));
        }
        Ok(lines.join("\n"))
    }
}
