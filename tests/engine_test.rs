// tests/engine_test.rs
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use version_keeper::config::{Mode, Settings, SourceConfig};
use version_keeper::source::{CommandProvider, SourceResolver};
use version_keeper::store::{ConfigStore, MemoryStore, VersionStore};
use version_keeper::{EventKind, VersionEngine, VersionError, VersionEvent, VersionRecord};

fn file_engine(path: &Path, settings: &Settings) -> VersionEngine {
    let store = ConfigStore::open(path).unwrap();
    VersionEngine::from_settings(Box::new(store), settings)
}

fn collect_events(engine: &mut VersionEngine) -> Arc<Mutex<Vec<VersionEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    engine.subscribe(move |event: &VersionEvent| sink.lock().unwrap().push(event.clone()));
    events
}

#[test]
fn test_bump_scenario_persists() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("version.toml");
    let mut engine = file_engine(&path, &Settings::default());

    assert_eq!(engine.read().unwrap(), VersionRecord::default());
    assert_eq!(engine.bump_patch().unwrap().to_string(), "0.0.1");
    assert_eq!(engine.bump_minor().unwrap().to_string(), "0.1.0");
    assert_eq!(engine.bump_major().unwrap().to_string(), "1.0.0");
    for _ in 0..3 {
        engine.bump_commit().unwrap();
    }

    let expected = VersionRecord::new(1, 0, 0).with_commit(3);
    assert_eq!(engine.read().unwrap(), expected);

    let mut reopened = ConfigStore::open(&path).unwrap();
    assert_eq!(reopened.load().unwrap(), expected);
}

#[test]
fn test_bumps_fire_events_in_order() {
    let store = MemoryStore::with_record(VersionRecord::new(1, 2, 3));
    let mut engine = VersionEngine::new(Box::new(store), None, Mode::Config).with_clock(|| 10);
    let events = collect_events(&mut engine);

    engine.bump_major().unwrap();
    engine.bump_minor().unwrap();
    engine.bump_patch().unwrap();
    engine.bump_commit().unwrap();
    engine.touch_timestamp().unwrap();

    let kinds: Vec<EventKind> = events.lock().unwrap().iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::MajorIncremented,
            EventKind::MinorIncremented,
            EventKind::PatchIncremented,
            EventKind::CommitIncremented,
            EventKind::TimestampUpdated,
        ]
    );

    let events = events.lock().unwrap();
    assert_eq!(events[0].previous, VersionRecord::new(1, 2, 3));
    assert_eq!(events[0].current, VersionRecord::new(2, 0, 0));
    assert_eq!(events[4].current.timestamp, Some(10));
    // every event starts where the previous one ended
    for pair in events.windows(2) {
        assert_eq!(pair[0].current, pair[1].previous);
    }
}

#[test]
fn test_repeated_reads_hit_the_cache() {
    let store = MemoryStore::with_record(VersionRecord::new(0, 9, 1));
    let mut engine = VersionEngine::new(Box::new(store.clone()), None, Mode::Config);

    let first = engine.read().unwrap();
    let second = engine.read().unwrap();

    assert_eq!(first, second);
    assert_eq!(store.load_count(), 1);
}

#[test]
fn test_absorb_rejected_in_config_mode() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("version.toml");
    fs::write(&path, "[current]\nmajor = 1\nminor = 0\npatch = 0\n").unwrap();
    let before = fs::read_to_string(&path).unwrap();

    let mut engine = file_engine(&path, &Settings::default());
    let err = engine.absorb().unwrap_err();

    assert!(matches!(err, VersionError::InvalidMode { .. }));
    assert_eq!(fs::read_to_string(&path).unwrap(), before);
}

#[test]
fn test_failed_save_leaves_read_unchanged() {
    let store = MemoryStore::with_record(VersionRecord::new(3, 1, 4).with_commit(1));
    let mut engine = VersionEngine::new(Box::new(store.clone()), None, Mode::Config);
    let before = engine.read().unwrap();

    store.fail_saves(true);
    let err = engine.bump_minor().unwrap_err();
    assert!(matches!(err, VersionError::StoreWrite { .. }));

    assert_eq!(engine.read().unwrap(), before);
    assert_eq!(store.record(), Some(before));
}

#[test]
fn test_bump_past_largest_counter_leaves_file_unchanged() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("version.toml");
    fs::write(&path, "[current]\nmajor = 9223372036854775807\nminor = 1\npatch = 1\n").unwrap();
    let before = fs::read_to_string(&path).unwrap();

    let mut engine = file_engine(&path, &Settings::default());
    let err = engine.bump_major().unwrap_err();

    assert!(matches!(err, VersionError::Malformed { .. }));
    assert_eq!(fs::read_to_string(&path).unwrap(), before);
    assert_eq!(engine.read().unwrap().major, 9_223_372_036_854_775_807);
}

#[cfg(unix)]
mod source {
    use super::*;

    fn local_source(command: &str, timeout_secs: u64) -> Settings {
        Settings {
            mode: Mode::LocalSource,
            source: SourceConfig {
                command: Some(command.to_string()),
                timeout_secs,
                ..SourceConfig::default()
            },
            ..Settings::default()
        }
    }

    #[test]
    fn test_absorb_from_local_command() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("version.toml");
        fs::write(&path, "[current]\nmajor = 1\nminor = 0\npatch = 0\ncommit = 2\n").unwrap();

        let mut engine = file_engine(&path, &local_source("echo 2.3.1-7", 5));
        let events = collect_events(&mut engine);

        let record = engine.absorb().unwrap();
        assert_eq!(record, VersionRecord::new(2, 3, 1).with_commit(7));

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::VersionAbsorbed);
        assert_eq!(events[0].previous, VersionRecord::new(1, 0, 0).with_commit(2));

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("major = 2"));
        assert!(content.contains("commit = 7"));
    }

    #[test]
    fn test_absorb_timeout_leaves_file_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("version.toml");
        fs::write(&path, "[current]\nmajor = 1\nminor = 0\npatch = 0\n").unwrap();
        let before = fs::read_to_string(&path).unwrap();

        let store = ConfigStore::open(&path).unwrap();
        let resolver = SourceResolver::new(
            Box::new(CommandProvider::new("sleep 5", ".".into(), "origin")),
            Duration::from_millis(200),
        );
        let mut engine = VersionEngine::new(Box::new(store), Some(resolver), Mode::LocalSource);

        let err = engine.absorb().unwrap_err();
        assert!(matches!(err, VersionError::SourceUnavailable { .. }));
        assert!(err.to_string().contains("timed out"));
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn test_absorb_failing_provider_is_fatal() {
        let store = MemoryStore::with_record(VersionRecord::new(1, 0, 0));
        let settings = local_source("exit 1", 5);
        let mut engine = VersionEngine::from_settings(Box::new(store.clone()), &settings);

        assert!(engine.absorb().is_err());
        assert_eq!(store.save_count(), 0);
        assert_eq!(engine.read().unwrap(), VersionRecord::new(1, 0, 0));
    }

    #[test]
    fn test_absorb_without_commit_keeps_counter() {
        let store = MemoryStore::with_record(VersionRecord::new(1, 0, 0).with_commit(40));
        let settings = local_source("echo v1.2.0", 5);
        let mut engine = VersionEngine::from_settings(Box::new(store), &settings);

        assert_eq!(
            engine.absorb().unwrap(),
            VersionRecord::new(1, 2, 0).with_commit(40)
        );
    }
}
