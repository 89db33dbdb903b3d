//! External version authorities
//!
//! In the two source modes the real version lives outside the backing file.
//! A [SourceProvider] knows how to ask one authority for it and returns a line
//! of text; [SourceResolver] bounds that call with a timeout and parses the
//! line into a [SourceVersion].
//!
//! Providers:
//!
//! - [command::CommandProvider]: any configured shell command
//! - [git::GitTagProvider]: highest semver tag of the local repository plus the
//!   number of commits since it
//! - [git::GitRemoteProvider]: highest semver tag advertised by a remote

pub mod command;
pub mod git;

pub use command::CommandProvider;
pub use git::{GitRemoteProvider, GitTagProvider};

use crate::config::{Mode, Settings};
use crate::domain::{check_counter, VersionRecord};
use crate::error::{Result, VersionError};
use regex::Regex;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

/// A version as reported by an external authority
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    /// Commits since the release, when the authority knows it
    pub commit: Option<u64>,
}

fn source_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[vV]?(\d+)\.(\d+)\.(\d+)(?:-(\d+))?(?:-g[0-9a-fA-F]+)?$")
            .expect("source version pattern is valid")
    })
}

impl SourceVersion {
    /// Parse provider output of the form `major.minor.patch[-commits]`.
    ///
    /// Only the first non-empty line is considered. A leading `v` and a
    /// trailing `git describe` hash (`-g1a2b3c`) are accepted.
    pub fn parse(output: &str) -> Result<Self> {
        let line = output
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .ok_or_else(|| VersionError::malformed("source output", "provider printed nothing"))?;

        let caps = source_pattern().captures(line).ok_or_else(|| {
            VersionError::malformed(
                "source output",
                format!("'{}' is not major.minor.patch[-commits]", line),
            )
        })?;

        let number = |idx: usize, field: &str| -> Result<u64> {
            caps[idx]
                .parse::<u64>()
                .map_err(|e| VersionError::malformed(field, e.to_string()))
                .and_then(|n| check_counter(field, n))
        };

        Ok(SourceVersion {
            major: number(1, "major")?,
            minor: number(2, "minor")?,
            patch: number(3, "patch")?,
            commit: match caps.get(4) {
                Some(_) => Some(number(4, "commit")?),
                None => None,
            },
        })
    }

    /// Overlay this version onto `record`.
    ///
    /// The commit counter is replaced only when the source reported one; the
    /// timestamp is never touched.
    pub fn apply_to(&self, record: &VersionRecord) -> VersionRecord {
        VersionRecord {
            major: self.major,
            minor: self.minor,
            patch: self.patch,
            commit: self.commit.unwrap_or(record.commit),
            timestamp: record.timestamp,
        }
    }
}

/// Something that can be asked for the authoritative version
///
/// Implementations must return within `timeout` or fail with
/// [SourceUnavailable](crate::error::VersionError::SourceUnavailable).
pub trait SourceProvider: Send + Sync {
    /// Short description used in errors and logs, e.g. the command line
    fn describe(&self) -> String;

    /// Query the authority and return its raw answer
    fn fetch(&self, timeout: Duration) -> Result<String>;
}

/// Resolves the authoritative version through a provider
pub struct SourceResolver {
    provider: Box<dyn SourceProvider>,
    timeout: Duration,
}

impl SourceResolver {
    pub fn new(provider: Box<dyn SourceProvider>, timeout: Duration) -> Self {
        SourceResolver { provider, timeout }
    }

    /// Build the resolver the settings ask for; `None` in `config` mode.
    ///
    /// A configured `source.command` wins over the built-in git providers.
    pub fn from_settings(settings: &Settings) -> Option<Self> {
        let source = &settings.source;
        let provider: Box<dyn SourceProvider> = match (settings.mode, &source.command) {
            (Mode::Config, _) => return None,
            (_, Some(command)) => Box::new(CommandProvider::new(
                command.clone(),
                source.repository.clone(),
                source.remote.clone(),
            )),
            (Mode::LocalSource, None) => Box::new(GitTagProvider::new(source.repository.clone())),
            (Mode::RemoteSource, None) => Box::new(GitRemoteProvider::new(
                source.repository.clone(),
                source.remote.clone(),
            )),
        };
        Some(SourceResolver::new(provider, source.timeout()))
    }

    pub fn describe(&self) -> String {
        self.provider.describe()
    }

    /// Ask the provider for the version; any failure is `SourceUnavailable`.
    pub fn resolve(&self) -> Result<SourceVersion> {
        let provider = self.provider.describe();
        info!(%provider, timeout_ms = self.timeout.as_millis() as u64, "resolving version from source");

        let output = self.provider.fetch(self.timeout)?;
        debug!(%provider, output = output.trim(), "provider answered");

        SourceVersion::parse(&output)
            .map_err(|e| VersionError::source_unavailable(provider, e.to_string()))
    }
}

/// Run `f` on a worker thread, giving up after `timeout`.
///
/// A timed-out worker is detached rather than cancelled.
pub(crate) fn run_with_timeout<T, F>(provider: String, timeout: Duration, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("version-source".to_string())
        .spawn(move || {
            let _ = tx.send(f());
        })
        .map_err(|e| VersionError::source_unavailable(provider.clone(), e.to_string()))?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(VersionError::source_unavailable(
            provider,
            timed_out(timeout),
        )),
        Err(RecvTimeoutError::Disconnected) => Err(VersionError::source_unavailable(
            provider,
            "provider stopped without an answer",
        )),
    }
}

pub(crate) fn timed_out(timeout: Duration) -> String {
    format!("timed out after {:.1}s", timeout.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceConfig;

    struct FixedProvider(&'static str);

    impl SourceProvider for FixedProvider {
        fn describe(&self) -> String {
            "fixed".to_string()
        }

        fn fetch(&self, _timeout: Duration) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_parse_with_commit() {
        let v = SourceVersion::parse("2.3.1-7").unwrap();
        assert_eq!(
            v,
            SourceVersion {
                major: 2,
                minor: 3,
                patch: 1,
                commit: Some(7)
            }
        );
    }

    #[test]
    fn test_parse_without_commit() {
        let v = SourceVersion::parse("v1.0.4\n").unwrap();
        assert_eq!(v.commit, None);
        assert_eq!((v.major, v.minor, v.patch), (1, 0, 4));
    }

    #[test]
    fn test_parse_git_describe() {
        let v = SourceVersion::parse("v0.9.2-14-g3f2a9c1").unwrap();
        assert_eq!((v.major, v.minor, v.patch, v.commit), (0, 9, 2, Some(14)));
    }

    #[test]
    fn test_parse_skips_blank_lines() {
        assert!(SourceVersion::parse("\n\n  1.2.3  \nnoise").is_ok());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for raw in ["", "1.2", "1.2.3.4", "-1.2.3", "v1.2.x", "fatal: no tags"] {
            assert!(SourceVersion::parse(raw).is_err(), "accepted {:?}", raw);
        }
    }

    #[test]
    fn test_parse_rejects_unstorable_numbers() {
        assert!(SourceVersion::parse("9223372036854775807.0.0").is_ok());
        let err = SourceVersion::parse("9223372036854775808.0.0").unwrap_err();
        assert!(matches!(err, VersionError::Malformed { ref field, .. } if field == "major"));
        let err = SourceVersion::parse("1.0.0-9223372036854775808").unwrap_err();
        assert!(matches!(err, VersionError::Malformed { ref field, .. } if field == "commit"));
    }

    #[test]
    fn test_apply_keeps_commit_when_absent() {
        let current = VersionRecord::new(1, 0, 0).with_commit(12).with_timestamp(5);
        let absorbed = SourceVersion::parse("1.1.0").unwrap().apply_to(&current);
        assert_eq!(
            absorbed,
            VersionRecord::new(1, 1, 0).with_commit(12).with_timestamp(5)
        );
    }

    #[test]
    fn test_apply_overwrites_commit() {
        let current = VersionRecord::new(1, 0, 0).with_commit(12);
        let absorbed = SourceVersion::parse("2.3.1-7").unwrap().apply_to(&current);
        assert_eq!(absorbed, VersionRecord::new(2, 3, 1).with_commit(7));
    }

    #[test]
    fn test_resolver_maps_parse_errors() {
        let resolver = SourceResolver::new(
            Box::new(FixedProvider("not a version")),
            Duration::from_secs(1),
        );
        let err = resolver.resolve().unwrap_err();
        assert!(matches!(err, VersionError::SourceUnavailable { ref provider, .. } if provider == "fixed"));
    }

    #[test]
    fn test_from_settings_picks_provider() {
        let mut settings = Settings::default();
        assert!(SourceResolver::from_settings(&settings).is_none());

        settings.mode = Mode::LocalSource;
        let resolver = SourceResolver::from_settings(&settings).unwrap();
        assert!(resolver.describe().starts_with("git tags"));

        settings.mode = Mode::RemoteSource;
        let resolver = SourceResolver::from_settings(&settings).unwrap();
        assert!(resolver.describe().contains("origin"));

        settings.source = SourceConfig {
            command: Some("git describe --tags".to_string()),
            ..SourceConfig::default()
        };
        let resolver = SourceResolver::from_settings(&settings).unwrap();
        assert!(resolver.describe().contains("git describe --tags"));
    }

    #[test]
    fn test_run_with_timeout_expires() {
        let err = run_with_timeout("slow".to_string(), Duration::from_millis(20), || {
            thread::sleep(Duration::from_millis(500));
            Ok(())
        })
        .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_run_with_timeout_returns_result() {
        let value = run_with_timeout("fast".to_string(), Duration::from_secs(5), || Ok(42)).unwrap();
        assert_eq!(value, 42);
    }
}
