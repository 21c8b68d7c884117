use anyhow::Result;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tempfile::TempDir;
use topk_sift::{
    top_k_from_reader, Candidate, ClientIp, TopKConfig, TopKError, TopKProcessor, WhitespaceField,
};

/// Helper to write a synthetic Common Log Format file
fn create_access_log(dir: &Path, name: &str, hits: &[(&str, usize)]) -> Result<PathBuf> {
    let mut content = String::new();
    let mut remaining: Vec<(&str, usize)> = hits.to_vec();
    // Interleave clients so no key arrives in one contiguous run.
    while remaining.iter().any(|(_, n)| *n > 0) {
        for (ip, n) in remaining.iter_mut() {
            if *n > 0 {
                content.push_str(&format!(
                    "{} - - [10/Oct/2000:13:55:36 -0700] \"GET /index.html HTTP/1.0\" 200 2326\n",
                    ip
                ));
                *n -= 1;
            }
        }
    }
    let path = dir.join(name);
    fs::write(&path, content)?;
    Ok(path)
}

fn test_config(partition_count: usize, top_k: usize) -> TopKConfig {
    TopKConfig {
        partition_count,
        top_k,
        processing_threads: 2,
        ..TopKConfig::default()
    }
}

#[test]
fn test_end_to_end_access_log() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let log = create_access_log(
        temp_dir.path(),
        "access.log",
        &[
            ("203.0.113.9", 40),
            ("198.51.100.2", 25),
            ("192.0.2.1", 25),
            ("10.1.1.1", 3),
            ("2001:db8::7", 12),
        ],
    )?;

    let reader = BufReader::new(File::open(&log)?);
    let report = top_k_from_reader(reader, &ClientIp, test_config(32, 3))?;

    assert_eq!(
        report.entries,
        vec![
            Candidate::new("203.0.113.9", 40),
            Candidate::new("192.0.2.1", 25),
            Candidate::new("198.51.100.2", 25),
        ]
    );
    assert_eq!(report.stats.total_records, 105);
    assert_eq!(report.stats.distinct_keys, 5);
    assert!(report.stats.bytes_spilled > 0);

    Ok(())
}

#[test]
fn test_many_clients_match_exact_count() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let clients: Vec<(String, usize)> = (0..400)
        .map(|i| (format!("172.16.{}.{}", i / 100, i % 100), 1 + (i * 7919) % 53))
        .collect();
    let hits: Vec<(&str, usize)> = clients.iter().map(|(ip, n)| (ip.as_str(), *n)).collect();
    let log = create_access_log(temp_dir.path(), "big.log", &hits)?;

    let mut expected: Vec<Candidate> = clients
        .iter()
        .map(|(ip, n)| Candidate::new(ip.clone(), *n as u64))
        .collect();
    expected.sort_by(|a, b| b.cmp(a));
    expected.truncate(20);

    for partitions in [3, 128] {
        let reader = BufReader::new(File::open(&log)?);
        let report = top_k_from_reader(reader, &ClientIp, test_config(partitions, 20))?;
        assert_eq!(report.entries, expected);
    }

    Ok(())
}

#[test]
fn test_whitespace_field_extraction() -> Result<()> {
    let log = "1.1.1.1 - alice [t] \"GET /a\"\n2.2.2.2 - bob [t] \"GET /b\"\n3.3.3.3 - alice [t] \"GET /c\"\n";
    let processor = TopKProcessor::new(test_config(4, 1))?;
    let report = processor.process_reader(log.as_bytes(), &WhitespaceField(2))?;

    assert_eq!(report.pairs(), vec![("alice".to_string(), 2)]);
    Ok(())
}

#[test]
fn test_invalid_utf8_lines_are_still_counted() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("binary.log");
    fs::write(&path, b"10.0.0.1 ok\n\xff\xfe garbage\n10.0.0.1 again\n")?;

    let reader = BufReader::new(File::open(&path)?);
    let report = top_k_from_reader(reader, &ClientIp, test_config(8, 5))?;

    assert_eq!(report.stats.total_records, 3);
    assert_eq!(report.entries[0], Candidate::new("10.0.0.1", 2));
    assert_eq!(report.entries[1].count, 1);
    assert!(report.entries[1].key.contains('\u{FFFD}'));
    Ok(())
}

#[test]
fn test_config_file_drives_processor() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config_path = temp_dir.path().join("topk.json");
    fs::write(&config_path, r#"{ "partition_count": 16, "top_k": 2, "processing_threads": 1 }"#)?;

    let config = TopKConfig::from_file(&config_path)?;
    let processor = TopKProcessor::new(config)?;
    let report = processor.process(["x", "y", "x", "z", "y", "x"], &|r: &str| r.to_string())?;

    assert_eq!(
        report.pairs(),
        vec![("x".to_string(), 3), ("y".to_string(), 2)]
    );
    Ok(())
}

#[test]
fn test_shutdown_flag_aborts_run() -> Result<()> {
    let processor = TopKProcessor::new(test_config(4, 3))?
        .with_shutdown_signal(Arc::new(AtomicBool::new(true)));
    let err = processor.process(["a", "b"], &ClientIp).unwrap_err();
    assert!(matches!(err, TopKError::Aborted));
    Ok(())
}

#[test]
fn test_repeated_runs_are_identical() -> Result<()> {
    let records: Vec<String> = (0..2_000).map(|i| format!("10.0.{}.{}", i % 3, i % 17)).collect();
    let processor = TopKProcessor::new(test_config(64, 10))?;

    let first = processor.process(&records, &|r: &str| r.to_string())?;
    let second = processor.process(&records, &|r: &str| r.to_string())?;
    assert_eq!(first.entries, second.entries);

    let mut naive: HashMap<&str, u64> = HashMap::new();
    for r in &records {
        *naive.entry(r.as_str()).or_insert(0) += 1;
    }
    for entry in &first.entries {
        assert_eq!(naive[entry.key.as_str()], entry.count);
    }
    Ok(())
}
