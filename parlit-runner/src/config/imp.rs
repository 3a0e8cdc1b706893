// Copyright (c) The parlit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::TestThreads;
use crate::errors::{ConfigParseError, ConfigParseErrorKind, ProfileNotFound};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, builder::DefaultState};
use serde::Deserialize;
use std::{
    collections::{BTreeSet, HashMap},
    sync::LazyLock,
    time::Duration,
};
use tracing::warn;

/// Gets the number of available CPUs and caches the value.
#[inline]
pub fn get_num_cpus() -> usize {
    static NUM_CPUS: LazyLock<usize> =
        LazyLock::new(|| match std::thread::available_parallelism() {
            Ok(count) => count.into(),
            Err(err) => {
                warn!("unable to determine num-cpus ({err}), assuming 1 logical CPU");
                1
            }
        });

    *NUM_CPUS
}

/// Overall configuration for parlit.
///
/// Most settings are managed through [profiles](ParlitProfile), obtained through the
/// [`profile`](Self::profile) method.
#[derive(Clone, Debug)]
pub struct ParlitConfig {
    workspace_root: Utf8PathBuf,
    default_profile: DefaultProfileImpl,
    other_profiles: HashMap<String, CustomProfileImpl>,
}

impl ParlitConfig {
    /// The default location of the config within the workspace root: `.config/parlit.toml`.
    pub const CONFIG_PATH: &'static str = ".config/parlit.toml";

    /// Contains the default config as a TOML file.
    ///
    /// Repository-specific configuration is layered on top of the default config.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../../default-config.toml");

    /// The name of the default profile.
    pub const DEFAULT_PROFILE: &'static str = "default";

    /// Reads the parlit config from the given file, or if not specified from
    /// `.config/parlit.toml` in the workspace root.
    ///
    /// If no config file is specified and the workspace root doesn't have `.config/parlit.toml`,
    /// uses the default config options. Unknown keys are reported as warnings.
    pub fn from_sources(
        workspace_root: impl Into<Utf8PathBuf>,
        config_file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        let workspace_root = workspace_root.into();
        let (config_file, source) = match config_file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let config_file = workspace_root.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        let builder = Self::make_default_config().add_source(source);
        let (config, unknown) = Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ConfigParseError::new(config_file.clone(), kind))?;

        if !unknown.is_empty() {
            let unknown: Vec<_> = unknown.iter().map(String::as_str).collect();
            warn!(
                "ignoring unknown configuration keys in config file {config_file}: {}",
                unknown.join(", ")
            );
        }

        Ok(config.into_config(workspace_root))
    }

    /// Returns the default configuration, without reading any files.
    pub fn default_config(workspace_root: impl Into<Utf8PathBuf>) -> Self {
        let (config, _unknown) = Self::build_and_deserialize_config(&Self::make_default_config())
            .expect("default config is always valid");
        config.into_config(workspace_root.into())
    }

    /// Returns the workspace root the config was read relative to.
    pub fn workspace_root(&self) -> &Utf8Path {
        &self.workspace_root
    }

    /// Returns the profile with the given name, or an error if a profile was specified but not
    /// found.
    pub fn profile(&self, name: impl AsRef<str>) -> Result<ParlitProfile<'_>, ProfileNotFound> {
        let name = name.as_ref();
        let custom_profile = match name {
            Self::DEFAULT_PROFILE => None,
            other => Some(
                self.other_profiles
                    .get(other)
                    .ok_or_else(|| ProfileNotFound::new(name, self.all_profiles()))?,
            ),
        };

        Ok(ParlitProfile {
            name: name.to_owned(),
            default_profile: &self.default_profile,
            custom_profile,
        })
    }

    fn all_profiles(&self) -> impl Iterator<Item = &str> {
        self.other_profiles
            .keys()
            .map(|key| key.as_str())
            .chain(std::iter::once(Self::DEFAULT_PROFILE))
    }

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    /// This returns a tuple of (config, ignored paths).
    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<(ParlitConfigDeserialize, BTreeSet<String>), ConfigParseErrorKind> {
        let config = builder
            .build_cloned()
            .map_err(|error| ConfigParseErrorKind::BuildError(Box::new(error)))?;

        let mut ignored = BTreeSet::new();
        let mut cb = |path: serde_ignored::Path| {
            ignored.insert(path.to_string());
        };
        let ignored_de = serde_ignored::Deserializer::new(config, &mut cb);
        let config: ParlitConfigDeserialize = serde_path_to_error::deserialize(ignored_de)
            .map_err(|error| {
                // serde_path_to_error already tracks the key, so drop it from the config error.
                let path = error.path().clone();
                let error = match error.into_inner() {
                    ConfigError::At { error, .. } => *error,
                    other => other,
                };
                ConfigParseErrorKind::DeserializeError(Box::new(serde_path_to_error::Error::new(
                    path, error,
                )))
            })?;

        Ok((config, ignored))
    }
}

/// A named set of settings, with unset keys falling back to the default profile.
///
/// Returned by [`ParlitConfig::profile`].
#[derive(Clone, Debug)]
pub struct ParlitProfile<'cfg> {
    name: String,
    default_profile: &'cfg DefaultProfileImpl,
    custom_profile: Option<&'cfg CustomProfileImpl>,
}

impl ParlitProfile<'_> {
    /// Returns the name of the profile.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the requested number of worker threads.
    pub fn test_threads(&self) -> TestThreads {
        self.custom_profile
            .and_then(|profile| profile.test_threads)
            .unwrap_or(self.default_profile.test_threads)
    }

    /// Returns the wall-clock budget for dispatching tests, if any.
    pub fn max_duration(&self) -> Option<Duration> {
        self.custom_profile
            .and_then(|profile| profile.max_duration)
            .or(self.default_profile.max_duration)
    }

    /// Returns true if only failures should be printed.
    pub fn quiet(&self) -> bool {
        self.flag(|profile| profile.quiet, self.default_profile.quiet)
    }

    /// Returns true if per-test lines for non-failing tests should be skipped.
    pub fn succinct(&self) -> bool {
        self.flag(|profile| profile.succinct, self.default_profile.succinct)
    }

    /// Returns true if the output of failing tests should be printed.
    pub fn verbose(&self) -> bool {
        self.flag(|profile| profile.verbose, self.default_profile.verbose)
    }

    /// Returns true if a progress bar should be shown in succinct mode.
    pub fn progress_bar(&self) -> bool {
        self.flag(
            |profile| profile.progress_bar,
            self.default_profile.progress_bar,
        )
    }

    /// Returns true if executor errors should abort the run.
    pub fn debug(&self) -> bool {
        self.flag(|profile| profile.debug, self.default_profile.debug)
    }

    fn flag(&self, get: impl FnOnce(&CustomProfileImpl) -> Option<bool>, default: bool) -> bool {
        self.custom_profile.and_then(get).unwrap_or(default)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ParlitConfigDeserialize {
    #[serde(rename = "profile")]
    profiles: HashMap<String, CustomProfileImpl>,
}

impl ParlitConfigDeserialize {
    fn into_config(mut self, workspace_root: Utf8PathBuf) -> ParlitConfig {
        let p = self
            .profiles
            .remove(ParlitConfig::DEFAULT_PROFILE)
            .expect("default profile should exist");
        ParlitConfig {
            workspace_root,
            default_profile: DefaultProfileImpl::new(p),
            other_profiles: self.profiles,
        }
    }
}

#[derive(Clone, Debug)]
struct DefaultProfileImpl {
    test_threads: TestThreads,
    max_duration: Option<Duration>,
    quiet: bool,
    succinct: bool,
    verbose: bool,
    progress_bar: bool,
    debug: bool,
}

impl DefaultProfileImpl {
    fn new(p: CustomProfileImpl) -> Self {
        Self {
            test_threads: p
                .test_threads
                .expect("test-threads present in default profile"),
            max_duration: p.max_duration,
            quiet: p.quiet.expect("quiet present in default profile"),
            succinct: p.succinct.expect("succinct present in default profile"),
            verbose: p.verbose.expect("verbose present in default profile"),
            progress_bar: p
                .progress_bar
                .expect("progress-bar present in default profile"),
            debug: p.debug.expect("debug present in default profile"),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct CustomProfileImpl {
    #[serde(default)]
    test_threads: Option<TestThreads>,
    #[serde(default, with = "humantime_serde")]
    max_duration: Option<Duration>,
    #[serde(default)]
    quiet: Option<bool>,
    #[serde(default)]
    succinct: Option<bool>,
    #[serde(default)]
    verbose: Option<bool>,
    #[serde(default)]
    progress_bar: Option<bool>,
    #[serde(default)]
    debug: Option<bool>,
}
