use anyhow::Result;
use std::fmt::Write;
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

use crate::top_k::TopKReport;

pub fn setup_logging(verbosity: &str) -> Result<()> {
    let level = match verbosity {
        "silent" => Level::ERROR,
        "normal" => Level::INFO,
        "verbose" => Level::DEBUG,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("topk_sift={}", level).parse()?);

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

/// Ranked listing, one `rank. key -> count` line per entry.
pub fn format_report(report: &TopKReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Top {} keys:", report.entries.len());
    for (rank, entry) in report.entries.iter().enumerate() {
        let key = if entry.key.is_empty() { "<empty>" } else { entry.key.as_str() };
        let _ = writeln!(out, "{:2}. {} -> {}", rank + 1, key, entry.count);
    }
    out
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

pub fn format_duration(seconds: f64) -> String {
    if seconds < 60.0 {
        format!("{:.1}s", seconds)
    } else if seconds < 3600.0 {
        format!("{:.1}m", seconds / 60.0)
    } else {
        format!("{:.1}h", seconds / 3600.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::top_k::{Candidate, TopKStats};

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512.00 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1048576), "1.00 MB");
        assert_eq!(format_bytes(1073741824), "1.00 GB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(30.0), "30.0s");
        assert_eq!(format_duration(90.0), "1.5m");
        assert_eq!(format_duration(3660.0), "1.0h");
    }

    #[test]
    fn test_format_report() {
        let report = TopKReport {
            entries: vec![Candidate::new("10.0.0.1", 3), Candidate::new("", 2)],
            stats: TopKStats::default(),
        };
        assert_eq!(
            format_report(&report),
            "Top 2 keys:\n 1. 10.0.0.1 -> 3\n 2. <empty> -> 2\n"
        );
    }
}
