//! A minimal host for unit tests.

use crate::{CodeId, CodeUnit, Host};

pub(crate) struct TestHost;

impl Host for TestHost {
    type Value = i64;
    type Fault = String;
}

/// A code unit whose instructions are all on `first_line`.
pub(crate) struct TestCode {
    pub(crate) id: CodeId,
    pub(crate) name: &'static str,
    pub(crate) first_line: u32,
}

impl TestCode {
    pub(crate) fn new(raw: u32, name: &'static str) -> Self {
        TestCode {
            id: CodeId::from_raw(raw),
            name,
            first_line: 1,
        }
    }
}

impl CodeUnit for TestCode {
    fn id(&self) -> CodeId {
        self.id
    }

    fn name(&self) -> &str {
        self.name
    }

    fn first_line(&self) -> u32 {
        self.first_line
    }

    fn line_at(&self, _offset: u32) -> Option<u32> {
        Some(self.first_line)
    }
}
