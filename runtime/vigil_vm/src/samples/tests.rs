#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]

use std::sync::Arc;

use pretty_assertions::assert_eq;
use rustc_hash::FxHashSet;

use super::*;
use crate::{Monitoring, Vm};

#[test]
fn test_every_sample_builds() {
    for sample in ALL {
        let code = sample.build().unwrap();
        assert_eq!(code.params(), 0, "{} must take no arguments", sample.name);
    }
}

#[test]
fn test_names_are_unique() {
    let names: FxHashSet<&str> = ALL.iter().map(|s| s.name).collect();
    assert_eq!(names.len(), ALL.len());
}

#[test]
fn test_find() {
    assert_eq!(find("floop").map(|s| s.name), Some("floop"));
    assert!(find("nope").is_none());
}

#[test]
fn test_builds_are_fresh_code_units() {
    let sample = find("f1").unwrap();
    assert_ne!(sample.build().unwrap().id(), sample.build().unwrap().id());
}

#[test]
fn test_samples_run_unmonitored() {
    let mut vm = Vm::new(Arc::new(Monitoring::new()));
    for sample in ALL {
        let result = vm.call(&sample.function().unwrap(), vec![]);
        match sample.name {
            "just_raise" => {
                assert_eq!(result.unwrap_err().kind, ExceptionKind::Exception);
            }
            "countdown" => assert_eq!(result, Ok(Value::Int(0))),
            _ => assert_eq!(result, Ok(Value::None), "{}", sample.name),
        }
    }
}
