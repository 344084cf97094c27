//! Display logic for whois-proxy CLI results.
//!
//! Text mode writes results to stdout and failures to stderr. JSON mode
//! collects every record and prints one array at the end.

use console::style;
use serde::Serialize;
use whois_proxy_lib::{QueryOutcome, WhoisProxyError};

/// The result of one CLI lookup, in either referral or raw mode.
#[derive(Debug, Clone, Serialize)]
pub struct LookupRecord {
    pub domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines_read: Option<usize>,
    pub truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LookupRecord {
    fn base(domain: &str, server: Option<&str>) -> Self {
        Self {
            domain: domain.trim().to_string(),
            server: server.map(str::to_string),
            referral: None,
            raw: None,
            lines_read: None,
            truncated: false,
            error: None,
        }
    }

    pub fn referral(domain: &str, server: Option<&str>, referral: Option<String>) -> Self {
        Self {
            referral,
            ..Self::base(domain, server)
        }
    }

    pub fn raw(domain: &str, server: Option<&str>, outcome: QueryOutcome) -> Self {
        Self {
            raw: Some(outcome.text),
            lines_read: Some(outcome.lines_read),
            truncated: outcome.truncated,
            ..Self::base(domain, server)
        }
    }

    pub fn failed(domain: &str, server: Option<&str>, error: &WhoisProxyError) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::base(domain, server)
        }
    }
}

/// Print one record in text mode.
///
/// With several domains, raw replies get a divider naming the domain.
pub fn print_record(record: &LookupRecord, multiple: bool) {
    if let Some(error) = &record.error {
        eprintln!(
            "{}  {}",
            style(&record.domain).bold(),
            style(format!("error: {}", error)).red()
        );
        return;
    }

    if let Some(raw) = &record.raw {
        if multiple {
            println!(
                "{} {}",
                style(format!("── {} ", record.domain)).cyan().bold(),
                style("─".repeat(40)).cyan().dim(),
            );
        }
        print!("{}", raw);
        if record.truncated {
            eprintln!(
                "{}",
                style(format!(
                    "Reply for {} truncated after {} lines",
                    record.domain,
                    record.lines_read.unwrap_or_default()
                ))
                .yellow()
            );
        }
        return;
    }

    match &record.referral {
        Some(server) => println!("{}  {}", style(&record.domain).bold(), style(server).green()),
        None => println!(
            "{}  {}",
            style(&record.domain).bold(),
            style("no referral found").yellow()
        ),
    }
}

/// Print all records as a pretty JSON array.
pub fn print_json(records: &[LookupRecord]) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(records)?);
    Ok(())
}
