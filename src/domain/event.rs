use crate::domain::VersionRecord;
use std::fmt;

/// Kinds of events published after a successful mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    MajorIncremented,
    MinorIncremented,
    PatchIncremented,
    CommitIncremented,
    TimestampUpdated,
    VersionAbsorbed,
}

impl EventKind {
    /// Stable key subscribers can match on
    pub fn key(&self) -> &'static str {
        match self {
            EventKind::MajorIncremented => "version.major-incremented",
            EventKind::MinorIncremented => "version.minor-incremented",
            EventKind::PatchIncremented => "version.patch-incremented",
            EventKind::CommitIncremented => "version.commit-incremented",
            EventKind::TimestampUpdated => "version.timestamp-updated",
            EventKind::VersionAbsorbed => "version.version-absorbed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Payload delivered to subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionEvent {
    pub kind: EventKind,
    pub previous: VersionRecord,
    pub current: VersionRecord,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_keys_are_distinct() {
        let kinds = [
            EventKind::MajorIncremented,
            EventKind::MinorIncremented,
            EventKind::PatchIncremented,
            EventKind::CommitIncremented,
            EventKind::TimestampUpdated,
            EventKind::VersionAbsorbed,
        ];
        let keys: std::collections::HashSet<_> = kinds.iter().map(|k| k.key()).collect();
        assert_eq!(keys.len(), kinds.len());
    }

    #[test]
    fn test_event_kind_display() {
        assert_eq!(
            EventKind::VersionAbsorbed.to_string(),
            "version.version-absorbed"
        );
    }
}
