// Copyright (c) The parlit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{config::get_num_cpus, errors::TestThreadsParseError};
use serde::Deserialize;
use std::{cmp::Ordering, fmt, str::FromStr};

/// Type for the test-threads config key and the `--threads` option.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(try_from = "TestThreadsRepr")]
pub enum TestThreads {
    /// Run tests with a specified number of threads.
    Count(usize),

    /// Run tests with a number of threads equal to the logical CPU count.
    #[default]
    NumCpus,
}

impl TestThreads {
    /// Gets the actual number of test threads computed at runtime.
    ///
    /// This is the requested count. The runner further clamps it to the number of tests.
    pub fn compute(self) -> usize {
        match self {
            Self::Count(threads) => threads,
            Self::NumCpus => get_num_cpus(),
        }
    }

    fn from_signed(count: i64) -> Option<Self> {
        match count.cmp(&0) {
            Ordering::Greater => Some(Self::Count(count as usize)),
            Ordering::Less => Some(Self::Count((get_num_cpus() as i64 + count).max(1) as usize)),
            Ordering::Equal => None,
        }
    }
}

impl FromStr for TestThreads {
    type Err = TestThreadsParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "num-cpus" {
            return Ok(Self::NumCpus);
        }

        let count = s.parse::<i64>().map_err(|_| TestThreadsParseError::new(s))?;
        Self::from_signed(count).ok_or_else(|| TestThreadsParseError::new(s))
    }
}

impl fmt::Display for TestThreads {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(threads) => write!(f, "{threads}"),
            Self::NumCpus => write!(f, "num-cpus"),
        }
    }
}

/// How `test-threads` is written in config files: a TOML integer or a string.
#[derive(Deserialize)]
#[serde(untagged)]
enum TestThreadsRepr {
    Count(i64),
    Named(String),
}

impl TryFrom<TestThreadsRepr> for TestThreads {
    type Error = TestThreadsParseError;

    fn try_from(repr: TestThreadsRepr) -> Result<Self, Self::Error> {
        match repr {
            TestThreadsRepr::Count(count) => Self::from_signed(count)
                .ok_or_else(|| TestThreadsParseError::new(count.to_string())),
            TestThreadsRepr::Named(name) => name.parse(),
        }
    }
}
