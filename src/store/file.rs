use crate::config::{Settings, DEFAULT_DOCUMENT, RECORD_TABLE};
use crate::domain::VersionRecord;
use crate::error::{Result, VersionError};
use crate::store::VersionStore;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use toml::{Table, Value};
use tracing::{debug, info};

/// TOML backing file holding the record under `[current]` plus auxiliary settings
pub struct ConfigStore {
    path: PathBuf,
    document: Table,
}

impl ConfigStore {
    /// Open a backing file; a missing file yields an empty document.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let document = read_document(&path)?;
        Ok(ConfigStore { path, document })
    }

    /// Seed the backing file with the default document unless it already exists.
    ///
    /// Returns `true` when a new file was written.
    pub fn bootstrap<P: AsRef<Path>>(path: P) -> Result<bool> {
        let path = path.as_ref();
        if path.exists() {
            return Ok(false);
        }
        write_atomic(path, DEFAULT_DOCUMENT)?;
        info!(path = %path.display(), "seeded version file");
        Ok(true)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Settings as found in the document at open (or last load) time.
    pub fn settings(&self) -> Result<Settings> {
        Settings::from_table(&self.document)
            .map_err(|e| VersionError::store_read(&self.path, e.message()))
    }

    /// Look up an auxiliary setting by dotted path, e.g. `source.command`.
    pub fn get_value(&self, key: &str) -> Option<&Value> {
        let mut parts = key.split('.');
        let mut current = self.document.get(parts.next()?)?;
        for part in parts {
            current = current.as_table()?.get(part)?;
        }
        Some(current)
    }

    /// Look up an auxiliary setting rendered as text, falling back to `default`.
    pub fn get(&self, key: &str, default: &str) -> String {
        match self.get_value(key) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => default.to_string(),
        }
    }

    /// Set an auxiliary setting and persist the document.
    ///
    /// The `current` table is reserved for the record and cannot be set here.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(VersionError::store_write(
                &self.path,
                format!("invalid setting key '{}'", key),
            ));
        }
        if parts[0] == RECORD_TABLE {
            return Err(VersionError::store_write(
                &self.path,
                format!(
                    "'{}' holds the version record and is changed through version commands",
                    RECORD_TABLE
                ),
            ));
        }

        let mut document = self.document.clone();
        let mut table = &mut document;
        for part in &parts[..parts.len() - 1] {
            let entry = table
                .entry(part.to_string())
                .or_insert_with(|| Value::Table(Table::new()));
            table = match entry {
                Value::Table(t) => t,
                _ => {
                    return Err(VersionError::store_write(
                        &self.path,
                        format!("'{}' is not a table", part),
                    ))
                }
            };
        }
        table.insert(parts[parts.len() - 1].to_string(), value.into());

        self.persist(document)?;
        debug!(key, "setting updated");
        Ok(())
    }

    fn persist(&mut self, document: Table) -> Result<()> {
        let content = toml::to_string(&document)
            .map_err(|e| VersionError::store_write(&self.path, e))?;
        write_atomic(&self.path, &content)?;
        self.document = document;
        Ok(())
    }
}

impl VersionStore for ConfigStore {
    fn load(&mut self) -> Result<VersionRecord> {
        self.document = read_document(&self.path)?;

        let record = match self.document.get(RECORD_TABLE) {
            None => VersionRecord::default(),
            Some(Value::Table(table)) => VersionRecord::from_table(table)
                .map_err(|e| VersionError::store_read(&self.path, e))?,
            Some(other) => {
                return Err(VersionError::store_read(
                    &self.path,
                    format!("'{}' must be a table, found {}", RECORD_TABLE, other.type_str()),
                ))
            }
        };

        debug!(path = %self.path.display(), %record, commit = record.commit, "loaded version");
        Ok(record)
    }

    fn save(&mut self, record: &VersionRecord) -> Result<()> {
        let mut document = self.document.clone();
        let table = record
            .to_table()
            .map_err(|e| VersionError::store_write(&self.path, e))?;
        document.insert(RECORD_TABLE.to_string(), Value::Table(table));
        self.persist(document)?;
        debug!(path = %self.path.display(), %record, commit = record.commit, "saved version");
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Interpret a raw command-line value as TOML (`10`, `true`, `"x"`), else as a string.
pub fn parse_setting_value(raw: &str) -> Value {
    toml::from_str::<Table>(&format!("value = {}", raw))
        .ok()
        .and_then(|mut t| t.remove("value"))
        .unwrap_or_else(|| Value::String(raw.to_string()))
}

fn read_document(path: &Path) -> Result<Table> {
    if !path.exists() {
        debug!(path = %path.display(), "version file absent, starting from zero");
        return Ok(Table::new());
    }

    let content = fs::read_to_string(path).map_err(|e| VersionError::store_read(path, e))?;
    toml::from_str(&content).map_err(|e| VersionError::store_read(path, e.message()))
}

/// Write to a uniquely named sibling temp file, fsync, then rename over the
/// target. Concurrent writers each get their own temp file.
fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let fail = |e: io::Error| VersionError::store_write(path, e);

    // Dropping the temp file on any early return removes it.
    let mut temp = tempfile::Builder::new()
        .prefix(".version-keeper.")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(fail)?;
    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(temp.path(), metadata.permissions()).map_err(fail)?;
    }
    temp.write_all(content.as_bytes()).map_err(fail)?;
    temp.as_file().sync_all().map_err(fail)?;
    temp.persist(path).map_err(|e| fail(e.error))?;

    // Make the rename itself durable.
    if let Ok(dir) = File::open(dir) {
        let _ = dir.sync_all();
    }

    Ok(())
}
