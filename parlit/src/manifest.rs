// Copyright (c) The parlit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test manifests: a minimal way to describe a suite of shell-driven tests.
//!
//! ```toml
//! [suite]
//! name = "basic"
//! source-root = "."     # relative to the manifest's directory
//! exec-root = "build"   # relative to the source root
//!
//! [[test]]
//! path = "arith/add.sh"
//! command = "sh arith/add.sh"
//! xfail = false
//! unsupported = false
//! ```

use crate::{errors::ManifestError, executor::ShellTest};
use camino::{Utf8Path, Utf8PathBuf};
use parlit_runner::list::{Test, TestList, TestSuite};
use serde::Deserialize;
use std::{collections::HashSet, sync::Arc};
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ManifestFile {
    suite: SuiteSection,
    #[serde(default, rename = "test")]
    tests: Vec<TestEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct SuiteSection {
    name: String,
    #[serde(default)]
    source_root: Option<Utf8PathBuf>,
    #[serde(default)]
    exec_root: Option<Utf8PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TestEntry {
    path: String,
    command: String,
    #[serde(default)]
    xfail: bool,
    #[serde(default)]
    unsupported: bool,
}

/// Reads every manifest and concatenates their tests, in manifest order.
pub(crate) fn load_manifests(
    manifests: &[Utf8PathBuf],
) -> Result<TestList<ShellTest>, ManifestError> {
    let mut tests = Vec::new();
    for manifest in manifests {
        let contents = std::fs::read_to_string(manifest).map_err(|err| ManifestError::Read {
            path: manifest.clone(),
            err,
        })?;
        let loaded = parse_manifest(manifest, &contents)?;
        debug!("loaded {} tests from {manifest}", loaded.len());
        tests.extend(loaded);
    }
    Ok(TestList::new(tests))
}

fn parse_manifest(
    manifest: &Utf8Path,
    contents: &str,
) -> Result<Vec<Test<ShellTest>>, ManifestError> {
    let file: ManifestFile = toml::from_str(contents).map_err(|err| ManifestError::Parse {
        path: manifest.to_owned(),
        err: Box::new(err),
    })?;

    let manifest_dir = match manifest.parent() {
        Some(dir) if !dir.as_str().is_empty() => dir,
        _ => Utf8Path::new("."),
    };
    let source_root = match &file.suite.source_root {
        Some(root) => manifest_dir.join(root),
        None => manifest_dir.to_owned(),
    };
    let exec_root = match &file.suite.exec_root {
        Some(root) => source_root.join(root),
        None => source_root.clone(),
    };
    let suite = Arc::new(TestSuite::new(file.suite.name, source_root, exec_root));

    let mut seen = HashSet::new();
    let mut tests = Vec::with_capacity(file.tests.len());
    for entry in file.tests {
        let components: Vec<_> = entry
            .path
            .split('/')
            .filter(|component| !component.is_empty())
            .map(str::to_owned)
            .collect();
        if components.is_empty() {
            return Err(ManifestError::EmptyTestPath {
                path: manifest.to_owned(),
            });
        }
        if !seen.insert(components.join("/")) {
            return Err(ManifestError::DuplicateTest {
                path: manifest.to_owned(),
                test: entry.path,
            });
        }

        let config = ShellTest {
            command: entry.command,
            xfail: entry.xfail,
            unsupported: entry.unsupported,
        };
        tests.push(Test::new(suite.clone(), components, config));
    }

    Ok(tests)
}
