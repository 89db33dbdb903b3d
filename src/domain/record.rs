use crate::error::{Result, VersionError};
use std::fmt;
use toml::{Table, Value};

/// Largest value a counter may hold; TOML integers are signed 64-bit.
pub const MAX_COUNTER: u64 = i64::MAX as u64;

/// The persisted version: semantic triple, commit counter and last timestamp
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VersionRecord {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub commit: u64,
    /// Unix time of the last `timestamp` update
    pub timestamp: Option<i64>,
}

/// Version bump type decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionBump {
    Major,
    Minor,
    Patch,
}

impl VersionRecord {
    /// Create a new record with a zero commit counter and no timestamp
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        VersionRecord {
            major,
            minor,
            patch,
            commit: 0,
            timestamp: None,
        }
    }

    pub fn with_commit(mut self, commit: u64) -> Self {
        self.commit = commit;
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Parse a record from its TOML text form.
    ///
    /// `major`, `minor` and `patch` are required, `commit` defaults to 0 and
    /// `timestamp` may be absent.
    pub fn parse(raw: &str) -> Result<Self> {
        let table: Table =
            toml::from_str(raw).map_err(|e| VersionError::malformed("record", e.message()))?;
        Self::from_table(&table)
    }

    /// Inverse of [`VersionRecord::parse`]
    pub fn serialize(&self) -> Result<String> {
        toml::to_string(&self.to_table()?).map_err(|e| VersionError::malformed("record", e.to_string()))
    }

    pub fn from_table(table: &Table) -> Result<Self> {
        Ok(VersionRecord {
            major: counter(table, "major", true)?,
            minor: counter(table, "minor", true)?,
            patch: counter(table, "patch", true)?,
            commit: counter(table, "commit", false)?,
            timestamp: match table.get("timestamp") {
                None => None,
                Some(Value::Integer(ts)) => Some(*ts),
                Some(other) => {
                    return Err(VersionError::malformed(
                        "timestamp",
                        format!("expected an integer, found {}", other.type_str()),
                    ))
                }
            },
        })
    }

    /// Fails with `Malformed` when a counter exceeds [`MAX_COUNTER`].
    pub fn to_table(&self) -> Result<Table> {
        let mut table = Table::new();
        table.insert("major".into(), integer("major", self.major)?);
        table.insert("minor".into(), integer("minor", self.minor)?);
        table.insert("patch".into(), integer("patch", self.patch)?);
        table.insert("commit".into(), integer("commit", self.commit)?);
        if let Some(ts) = self.timestamp {
            table.insert("timestamp".into(), Value::Integer(ts));
        }
        Ok(table)
    }

    /// Bump one semantic component, resetting the lower-order ones.
    ///
    /// The commit counter and timestamp are carried over untouched.
    pub fn bump(&self, bump_type: VersionBump) -> Result<Self> {
        let mut next = *self;
        match bump_type {
            VersionBump::Major => {
                next.major = increment("major", self.major)?;
                next.minor = 0;
                next.patch = 0;
            }
            VersionBump::Minor => {
                next.minor = increment("minor", self.minor)?;
                next.patch = 0;
            }
            VersionBump::Patch => {
                next.patch = increment("patch", self.patch)?;
            }
        }
        Ok(next)
    }

    pub fn bump_commit(&self) -> Result<Self> {
        Ok(VersionRecord {
            commit: increment("commit", self.commit)?,
            ..*self
        })
    }
}

impl fmt::Display for VersionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

fn counter(table: &Table, field: &str, required: bool) -> Result<u64> {
    match table.get(field) {
        None if required => Err(VersionError::malformed(field, "missing required field")),
        None => Ok(0),
        Some(Value::Integer(n)) => u64::try_from(*n)
            .map_err(|_| VersionError::malformed(field, format!("{} is negative", n))),
        Some(other) => Err(VersionError::malformed(
            field,
            format!("expected an integer, found {}", other.type_str()),
        )),
    }
}

/// Reject counters that cannot be stored as a TOML integer.
pub fn check_counter(field: &str, n: u64) -> Result<u64> {
    if n > MAX_COUNTER {
        return Err(VersionError::malformed(
            field,
            format!("{} exceeds the largest storable value {}", n, MAX_COUNTER),
        ));
    }
    Ok(n)
}

fn increment(field: &str, n: u64) -> Result<u64> {
    let next = n
        .checked_add(1)
        .ok_or_else(|| VersionError::malformed(field, "counter overflow"))?;
    check_counter(field, next)
}

fn integer(field: &str, n: u64) -> Result<Value> {
    Ok(Value::Integer(check_counter(field, n)? as i64))
}
