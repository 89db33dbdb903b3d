//! The version-state engine
//!
//! [VersionEngine] owns the in-memory copy of the record for one run and is
//! the only thing that mutates it. Every mutation follows the same sequence:
//!
//! 1. resolve the current record (cache, else [VersionStore::load])
//! 2. compute the next record
//! 3. [VersionStore::save] it
//! 4. update the cache
//! 5. publish a [VersionEvent] to subscribers, synchronously
//!
//! A failure at any step aborts the operation before the cache or the
//! subscribers see anything.

pub mod cache;
pub mod events;

pub use cache::VersionCache;
pub use events::EventBus;

use crate::config::{Mode, Settings};
use crate::domain::{EventKind, VersionBump, VersionEvent, VersionRecord};
use crate::error::{Result, VersionError};
use crate::source::SourceResolver;
use crate::store::VersionStore;
use tracing::{debug, info};

type Clock = Box<dyn Fn() -> i64 + Send + Sync>;

pub struct VersionEngine {
    store: Box<dyn VersionStore>,
    resolver: Option<SourceResolver>,
    events: EventBus,
    cache: VersionCache,
    mode: Mode,
    allow_override: bool,
    clock: Clock,
}

impl VersionEngine {
    /// Create an engine over `store`; `resolver` is required for `absorb`.
    pub fn new(store: Box<dyn VersionStore>, resolver: Option<SourceResolver>, mode: Mode) -> Self {
        VersionEngine {
            store,
            resolver,
            events: EventBus::new(),
            cache: VersionCache::new(),
            mode,
            allow_override: false,
            clock: Box::new(|| chrono::Utc::now().timestamp()),
        }
    }

    /// Create an engine with the resolver the settings ask for.
    pub fn from_settings(store: Box<dyn VersionStore>, settings: &Settings) -> Self {
        Self::new(store, SourceResolver::from_settings(settings), settings.mode)
    }

    /// Allow major/minor/patch bumps even in a source mode.
    pub fn with_override(mut self, allow: bool) -> Self {
        self.allow_override = allow;
        self
    }

    /// Replace the unix-time clock used by `touch_timestamp`.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> i64 + Send + Sync + 'static,
    {
        self.clock = Box::new(clock);
        self
    }

    pub fn subscribe<F>(&mut self, subscriber: F)
    where
        F: FnMut(&VersionEvent) + Send + 'static,
    {
        self.events.subscribe(subscriber);
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Current record; the store is consulted at most once per run.
    pub fn read(&mut self) -> Result<VersionRecord> {
        if let Some(record) = self.cache.version() {
            return Ok(record);
        }

        let record = self.store.load()?;
        debug!(store = %self.store.describe(), %record, "version cache filled");
        self.cache.store(record);
        Ok(record)
    }

    /// Current commit counter, served from the cached record.
    pub fn commit(&mut self) -> Result<u64> {
        Ok(self.read()?.commit)
    }

    pub fn bump_major(&mut self) -> Result<VersionRecord> {
        self.bump(VersionBump::Major, EventKind::MajorIncremented, "major")
    }

    pub fn bump_minor(&mut self) -> Result<VersionRecord> {
        self.bump(VersionBump::Minor, EventKind::MinorIncremented, "minor")
    }

    pub fn bump_patch(&mut self) -> Result<VersionRecord> {
        self.bump(VersionBump::Patch, EventKind::PatchIncremented, "patch")
    }

    pub fn bump_commit(&mut self) -> Result<VersionRecord> {
        self.apply(EventKind::CommitIncremented, VersionRecord::bump_commit)
    }

    pub fn touch_timestamp(&mut self) -> Result<VersionRecord> {
        let now = (self.clock)();
        self.apply(EventKind::TimestampUpdated, |current| {
            Ok(VersionRecord {
                timestamp: Some(now),
                ..*current
            })
        })
    }

    /// Replace the record with the one reported by the external source.
    ///
    /// Only valid in `local-source` and `remote-source` mode. The source is
    /// queried before anything else happens, so a provider failure leaves
    /// both the store and the cache untouched.
    pub fn absorb(&mut self) -> Result<VersionRecord> {
        if !self.mode.is_source() {
            return Err(VersionError::invalid_mode("absorb", self.mode));
        }

        let resolver = self.resolver.as_ref().ok_or_else(|| {
            VersionError::source_unavailable("none", "no source provider configured")
        })?;
        let source = resolver.resolve()?;

        self.apply(EventKind::VersionAbsorbed, |current| Ok(source.apply_to(current)))
    }

    fn bump(&mut self, bump: VersionBump, kind: EventKind, operation: &str) -> Result<VersionRecord> {
        if self.mode.is_source() && !self.allow_override {
            return Err(VersionError::invalid_mode(operation, self.mode));
        }
        self.apply(kind, |current| current.bump(bump))
    }

    fn apply<F>(&mut self, kind: EventKind, transition: F) -> Result<VersionRecord>
    where
        F: FnOnce(&VersionRecord) -> Result<VersionRecord>,
    {
        let previous = self.read()?;
        let current = transition(&previous)?;

        self.store.save(&current)?;
        self.cache.store(current);

        info!(
            event = kind.key(),
            from = %previous,
            to = %current,
            commit = current.commit,
            "version updated"
        );
        self.events.publish(&VersionEvent {
            kind,
            previous,
            current,
        });

        Ok(current)
    }
}
