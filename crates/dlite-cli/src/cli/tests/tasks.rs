//! Tests for poll, acquire and send-status subcommands.

use super::parse;
use crate::cli::commands::parse_data;
use crate::cli::{CliCommand, CodeArg};
use dlite_core::TaskCode;

#[test]
fn cli_parse_poll() {
    match parse(&["dlite", "poll", "--id", "d-1"]) {
        CliCommand::Poll { id } => assert_eq!(id, "d-1"),
        _ => panic!("expected Poll"),
    }
}

#[test]
fn cli_parse_acquire() {
    match parse(&["dlite", "acquire", "--id", "d-1", "task-7"]) {
        CliCommand::Acquire { id, task_id } => {
            assert_eq!(id, "d-1");
            assert_eq!(task_id, "task-7");
        }
        _ => panic!("expected Acquire"),
    }
}

#[test]
fn cli_parse_send_status_defaults() {
    match parse(&["dlite", "send-status", "--id", "d-1", "task-7"]) {
        CliCommand::SendStatus {
            id,
            task_id,
            code,
            task_type,
            data,
        } => {
            assert_eq!(id, "d-1");
            assert_eq!(task_id, "task-7");
            assert_eq!(code, CodeArg::Ok);
            assert!(task_type.is_none());
            assert!(data.is_none());
        }
        _ => panic!("expected SendStatus"),
    }
}

#[test]
fn cli_parse_send_status_failed_with_data() {
    match parse(&[
        "dlite",
        "send-status",
        "--id",
        "d-1",
        "task-7",
        "--code",
        "failed",
        "--type",
        "SCRIPT",
        "--data",
        r#"{"exitCode":2}"#,
    ]) {
        CliCommand::SendStatus {
            code,
            task_type,
            data,
            ..
        } => {
            assert_eq!(TaskCode::from(code), TaskCode::Failed);
            assert_eq!(task_type.as_deref(), Some("SCRIPT"));
            assert_eq!(parse_data(data.as_deref()).unwrap()["exitCode"], 2);
        }
        _ => panic!("expected SendStatus"),
    }
}

#[test]
fn send_status_data_must_be_json() {
    assert!(parse_data(Some("not json")).is_err());
    assert_eq!(parse_data(None).unwrap(), serde_json::Value::Null);
}
