//! Tag filter behavior observed through the console sink

use qlog_rs::{CaptureOutput, Level, LoggerBuilder};

fn logger(level: Level) -> (qlog_rs::Logger, CaptureOutput) {
    let capture = CaptureOutput::new();
    let logger = LoggerBuilder::new()
        .level(level)
        .timestamp(false)
        .console_output(Box::new(capture.clone()))
        .build()
        .unwrap();
    (logger, capture)
}

#[test]
fn test_net_rule_suppresses_debug() {
    let (logger, capture) = logger(Level::Debug);
    logger.add_filter_rule("net", Level::Warning).unwrap();

    logger.log(Some("net"), Level::Debug, format_args!("retrying\n"));
    assert!(capture.contents().is_empty());

    logger.log(Some("net"), Level::Error, format_args!("unreachable\n"));
    assert_eq!(capture.lines(), vec!["E/net: unreachable"]);
}

#[test]
fn test_rule_ceiling_is_inclusive() {
    let (logger, capture) = logger(Level::Debug);
    logger.add_filter_rule("net", Level::Warning).unwrap();

    for level in Level::ALL {
        logger.log(Some("net"), level, format_args!("{}\n", level));
    }
    assert_eq!(capture.lines(), vec!["F/net: fatal", "E/net: error", "W/net: warning"]);
}

#[test]
fn test_global_gate_applies_before_rules() {
    let (logger, capture) = logger(Level::Warning);
    // A permissive rule cannot widen the global level
    logger.add_filter_rule("net", Level::Debug).unwrap();

    logger.log(Some("net"), Level::Info, format_args!("gated\n"));
    logger.log(Some("disk"), Level::Info, format_args!("gated\n"));
    logger.log(Some("disk"), Level::Warning, format_args!("passes\n"));

    assert_eq!(capture.lines(), vec!["W/disk: passes"]);
}

#[test]
fn test_untagged_records_ignore_rules() {
    let (logger, capture) = logger(Level::Info);
    logger.add_filter_rule("net", Level::Fatal).unwrap();

    logger.log(None, Level::Info, format_args!("untagged\n"));
    assert_eq!(capture.lines(), vec!["I/: untagged"]);
}

#[test]
fn test_rule_capacity_reported() {
    let capture = CaptureOutput::new();
    let logger = LoggerBuilder::new()
        .tag_capacity(2)
        .console_output(Box::new(capture))
        .build()
        .unwrap();

    logger.add_filter_rule("a", Level::Info).unwrap();
    logger.add_filter_rule("b", Level::Info).unwrap();
    assert!(logger.add_filter_rule("c", Level::Info).is_err());
    assert!(logger.add_filter_rule("waytoolongforatag", Level::Info).is_err());
}
