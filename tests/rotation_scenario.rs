//! File sink rotation through the public logger API

use qlog_rs::{initialize, Level, FILE_BUFFER_SIZE};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

/// Records are exactly 64 bytes: "I/r: " + 58 digits + "\n"
const RECORD_LEN: usize = 64;
const PER_FLUSH: usize = FILE_BUFFER_SIZE / RECORD_LEN;

fn emit(logger: &qlog_rs::Logger, range: std::ops::Range<usize>) {
    for i in range {
        logger.log(Some("r"), Level::Info, format_args!("{:0>58}\n", i));
    }
}

fn holds(path: &Path, index: usize) -> bool {
    fs::read_to_string(path)
        .map(|text| text.contains(&format!("I/r: {:0>58}\n", index)))
        .unwrap_or(false)
}

#[test]
fn test_three_file_rotation() {
    let dir = tempdir().unwrap();
    let logger = initialize(Level::Info, false, false, 4).unwrap();
    logger.enable_console_sink(false).unwrap();
    logger.register_file_sink("log", dir.path(), 3, 1024).unwrap();
    logger.enable_file_sink(true).unwrap();

    // Three buffer flushes of 512 bytes into 1024-byte files: two rotations
    emit(&logger, 0..3 * PER_FLUSH);

    let active = dir.path().join("log.log");
    let gen0 = dir.path().join("log.log.0");
    let gen1 = dir.path().join("log.log.1");
    let gen2 = dir.path().join("log.log.2");

    assert!(active.exists());
    assert!(gen0.exists());
    assert!(gen1.exists());
    assert!(!gen2.exists());

    assert!(holds(&active, 2 * PER_FLUSH));
    assert!(holds(&gen0, PER_FLUSH));
    assert!(holds(&gen1, 0));

    // Two more rotations fill .2 and then evict the oldest generation
    emit(&logger, 3 * PER_FLUSH..5 * PER_FLUSH);
    assert!(holds(&active, 4 * PER_FLUSH));
    assert!(holds(&gen0, 3 * PER_FLUSH));
    assert!(holds(&gen1, 2 * PER_FLUSH));
    assert!(holds(&gen2, PER_FLUSH));
    assert!(!dir.path().join("log.log.3").exists());
    for path in [&active, &gen0, &gen1, &gen2] {
        assert!(!holds(path, 0));
    }
}

#[test]
fn test_files_are_plain_and_capped() {
    let dir = tempdir().unwrap();
    let logger = initialize(Level::Debug, true, true, 4).unwrap();
    logger.enable_console_sink(false).unwrap();
    logger.register_file_sink("capped.log", dir.path(), 4, 2048).unwrap();
    logger.enable_file_sink(true).unwrap();

    for i in 0..500 {
        logger.log(Some("cap"), Level::Debug, format_args!("record {}\n", i));
    }
    logger.flush().unwrap();

    let mut seen = 0;
    for entry in fs::read_dir(dir.path()).unwrap() {
        let path = entry.unwrap().path();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("capped.log"), "unexpected file {}", name);
        assert_ne!(name, "capped.log.log");

        let bytes = fs::read(&path).unwrap();
        assert!(bytes.len() < 2048);
        assert!(!bytes.contains(&0x1b));
        seen += 1;
    }
    assert_eq!(seen, 5);
}

#[test]
fn test_restart_discards_previous_active_file() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("svc.log"), "previous run\n").unwrap();

    let logger = initialize(Level::Info, false, false, 4).unwrap();
    logger.enable_console_sink(false).unwrap();
    logger.register_file_sink("svc", dir.path(), 2, 4096).unwrap();
    logger.enable_file_sink(true).unwrap();
    logger.log(Some("s"), Level::Info, format_args!("fresh\n"));
    drop(logger);

    let text = fs::read_to_string(dir.path().join("svc.log")).unwrap();
    assert_eq!(text, "I/s: fresh\n");
}

#[test]
fn test_missing_directory_created() {
    let dir = tempdir().unwrap();
    let nested = dir.path().join("deep").join("er");

    let logger = initialize(Level::Info, false, false, 4).unwrap();
    logger.enable_console_sink(false).unwrap();
    logger.register_file_sink("app", &nested, 2, 4096).unwrap();
    logger.enable_file_sink(true).unwrap();
    logger.log(Some("d"), Level::Error, format_args!("made it\n"));
    logger.flush().unwrap();

    assert_eq!(
        fs::read_to_string(nested.join("app.log")).unwrap(),
        "E/d: made it\n"
    );
}
