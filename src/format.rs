//! Rendering a version record through a template.
//!
//! A template is either the name of a format (`full`, `compact`, or one from
//! `[formats]`) or literal text with `{token}` placeholders. Unknown tokens are
//! an error rather than being dropped from the output.

use crate::config::Settings;
use crate::domain::VersionRecord;
use crate::error::{Result, VersionError};
use chrono::{DateTime, Utc};
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Built-in named formats; user formats with the same name replace them.
const BUILTIN_FORMATS: &[(&str, &str)] = &[
    ("full", "{major}.{minor}.{patch}"),
    ("compact", "v{major}.{minor}.{patch}-{commit}"),
    ("version", "{major}.{minor}.{patch} (commit {commit})"),
    ("major", "{major}"),
    ("minor", "{minor}"),
    ("patch", "{patch}"),
    ("commit", "{commit}"),
    ("timestamp", "{timestamp}"),
];

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{([^{}]*)\}").expect("token pattern is valid"))
}

/// Renders records using named formats or inline templates
#[derive(Debug, Clone)]
pub struct Formatter {
    formats: HashMap<String, String>,
}

impl Default for Formatter {
    fn default() -> Self {
        Formatter {
            formats: BUILTIN_FORMATS
                .iter()
                .map(|(name, template)| (name.to_string(), template.to_string()))
                .collect(),
        }
    }
}

impl Formatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in formats overlaid with the user's `[formats]` table
    pub fn from_settings(settings: &Settings) -> Self {
        let mut formatter = Self::new();
        formatter.formats.extend(
            settings
                .formats
                .iter()
                .map(|(name, template)| (name.clone(), template.clone())),
        );
        formatter
    }

    /// The template a name stands for, or the input itself if it names nothing.
    pub fn template_for<'a>(&'a self, name_or_template: &'a str) -> &'a str {
        self.formats
            .get(name_or_template)
            .map(String::as_str)
            .unwrap_or(name_or_template)
    }

    pub fn format(&self, record: &VersionRecord, name_or_template: &str) -> Result<String> {
        let template = self.template_for(name_or_template);

        let mut failure = None;
        let rendered = token_pattern().replace_all(template, |caps: &Captures| {
            match render_token(record, &caps[1]) {
                Ok(Some(value)) => value,
                Ok(None) => {
                    failure.get_or_insert_with(|| VersionError::unknown_token(&caps[1], template));
                    String::new()
                }
                Err(e) => {
                    failure.get_or_insert(e);
                    String::new()
                }
            }
        });

        match failure {
            Some(err) => Err(err),
            None => Ok(rendered.into_owned()),
        }
    }
}

/// Render `record` with the built-in formats only.
pub fn format(record: &VersionRecord, name_or_template: &str) -> Result<String> {
    Formatter::new().format(record, name_or_template)
}

fn render_token(record: &VersionRecord, token: &str) -> Result<Option<String>> {
    let value = match token {
        "major" => record.major.to_string(),
        "minor" => record.minor.to_string(),
        "patch" => record.patch.to_string(),
        "commit" => record.commit.to_string(),
        "full" => record.to_string(),
        "timestamp" => record.timestamp.map(|ts| ts.to_string()).unwrap_or_default(),
        _ => {
            let pattern = match token {
                "timestamp-date" => "%Y-%m-%d",
                "timestamp-datetime" => "%Y-%m-%d %H:%M:%S",
                "timestamp-year" => "%Y",
                "timestamp-month" => "%m",
                "timestamp-day" => "%d",
                "timestamp-hour" => "%H",
                "timestamp-minute" => "%M",
                "timestamp-second" => "%S",
                _ => return Ok(None),
            };
            match record.timestamp {
                None => String::new(),
                Some(ts) => {
                    let moment = DateTime::<Utc>::from_timestamp(ts, 0).ok_or_else(|| {
                        VersionError::malformed("timestamp", format!("{} is out of range", ts))
                    })?;
                    moment.format(pattern).to_string()
                }
            }
        }
    };
    Ok(Some(value))
}
