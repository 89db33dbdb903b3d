use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Backing file used when no path is given on the command line.
pub const DEFAULT_FILE: &str = "version.toml";

/// Name of the built-in format that renders `major.minor.patch`.
pub const DEFAULT_FORMAT: &str = "full";

/// Table inside the backing file that holds the version record itself.
pub const RECORD_TABLE: &str = "current";

/// Contents written by `init` when seeding a fresh backing file.
pub const DEFAULT_DOCUMENT: &str = r#"# Source of truth: config | local-source | remote-source
mode = "config"

# Format used by `show` when none is given
format = "full"

# Directive name exposed to template integrations
directive = "version"

[current]
major = 0
minor = 0
patch = 0
commit = 0

[source]
# Provider command; when unset git is queried directly
# command = "git describe --tags --long"
repository = "."
remote = "origin"
timeout_secs = 10

[formats]
compact = "v{major}.{minor}.{patch}-{commit}"
"#;

/// Where the authoritative version comes from.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    #[default]
    Config,
    #[serde(alias = "git-local")]
    LocalSource,
    #[serde(alias = "git-remote")]
    RemoteSource,
}

impl Mode {
    pub fn is_source(&self) -> bool {
        !matches!(self, Mode::Config)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Config => "config",
            Mode::LocalSource => "local-source",
            Mode::RemoteSource => "remote-source",
        })
    }
}

fn default_format() -> String {
    DEFAULT_FORMAT.to_string()
}

fn default_directive() -> String {
    "version".to_string()
}

fn default_repository() -> PathBuf {
    PathBuf::from(".")
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

/// Process-wide settings read once from the backing file.
///
/// Every field has a default so a file holding only `[current]` (or no file
/// at all) still yields usable settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub mode: Mode,

    #[serde(default = "default_format")]
    pub format: String,

    #[serde(default = "default_directive")]
    pub directive: String,

    #[serde(default)]
    pub source: SourceConfig,

    /// Named format templates, layered over the built-in ones.
    #[serde(default)]
    pub formats: HashMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            mode: Mode::default(),
            format: default_format(),
            directive: default_directive(),
            source: SourceConfig::default(),
            formats: HashMap::new(),
        }
    }
}

/// Settings for the external version provider.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SourceConfig {
    /// Shell command printing `major.minor.patch[-commits]`.
    ///
    /// `{repository}` and `{remote}` are substituted before running it.
    #[serde(default)]
    pub command: Option<String>,

    #[serde(default = "default_repository")]
    pub repository: PathBuf,

    /// Remote name or URL queried in `remote-source` mode.
    #[serde(default = "default_remote")]
    pub remote: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            command: None,
            repository: default_repository(),
            remote: default_remote(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Settings {
    /// Read settings out of an already parsed backing document.
    ///
    /// The `current` table is ignored here; it belongs to the record.
    pub fn from_table(table: &toml::Table) -> Result<Self, toml::de::Error> {
        let mut table = table.clone();
        table.remove(RECORD_TABLE);
        toml::Value::Table(table).try_into()
    }
}
