use crate::domain::VersionRecord;

/// Per-run memo of the resolved record.
///
/// The `version` and `commit` keys share one slot, so the commit counter can
/// never disagree with the record it belongs to.
#[derive(Debug, Default, Clone)]
pub struct VersionCache {
    version: Option<VersionRecord>,
}

impl VersionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(&self) -> Option<VersionRecord> {
        self.version
    }

    pub fn commit(&self) -> Option<u64> {
        self.version.map(|record| record.commit)
    }

    /// Remember a freshly loaded or saved record.
    pub fn store(&mut self, record: VersionRecord) {
        self.version = Some(record);
    }
}
