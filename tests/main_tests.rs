use anyhow::Result;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;
use topk_sift::TopKReport;

fn topk_sift() -> Command {
    Command::new(env!("CARGO_BIN_EXE_topk-sift"))
}

fn write_log(dir: &Path) -> Result<std::path::PathBuf> {
    let lines = [
        "10.0.0.1 - - [t] \"GET /\" 200 1",
        "10.0.0.2 - - [t] \"GET /\" 200 1",
        "10.0.0.1 - - [t] \"GET /\" 200 1",
        "10.0.0.3 - - [t] \"GET /\" 200 1",
        "10.0.0.1 - - [t] \"GET /\" 200 1",
        "10.0.0.2 - - [t] \"GET /\" 200 1",
    ];
    let path = dir.join("access.log");
    fs::write(&path, lines.join("\n"))?;
    Ok(path)
}

#[test]
fn test_cli_prints_ranked_keys() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let log = write_log(temp_dir.path())?;

    let output = topk_sift().arg(&log).args(["-k", "2", "-p", "4"]).output()?;
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout)?;
    assert_eq!(stdout, "Top 2 keys:\n 1. 10.0.0.1 -> 3\n 2. 10.0.0.2 -> 2\n");
    Ok(())
}

#[test]
fn test_cli_json_report() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let log = write_log(temp_dir.path())?;

    let output = topk_sift().arg(&log).args(["--top", "5", "--json"]).output()?;
    assert!(output.status.success());

    let report: TopKReport = serde_json::from_slice(&output.stdout)?;
    assert_eq!(
        report.pairs(),
        vec![
            ("10.0.0.1".to_string(), 3),
            ("10.0.0.2".to_string(), 2),
            ("10.0.0.3".to_string(), 1),
        ]
    );
    assert_eq!(report.stats.total_records, 6);
    Ok(())
}

#[test]
fn test_cli_missing_input_fails() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output = topk_sift().arg(temp_dir.path().join("nope.log")).output()?;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Input file does not exist"));
    Ok(())
}

#[test]
fn test_cli_rejects_invalid_partition_count() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let log = write_log(temp_dir.path())?;

    let output = topk_sift().arg(&log).args(["-p", "0"]).output()?;
    assert!(!output.status.success());
    Ok(())
}

#[test]
fn test_cli_counts_selected_field() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let log = write_log(temp_dir.path())?;

    let output = topk_sift().arg(&log).args(["-f", "6", "-k", "1"]).output()?;
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout)?;
    assert_eq!(stdout, "Top 1 keys:\n 1. 200 -> 6\n");
    Ok(())
}
