//! In-memory archive backend.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use super::{ARCHIVE_TARGET, Archive, ArchiveError, MemoryConfig, Settings};
use crate::context::Context;
use crate::fingerprint::FingerprintStrategy;

/// Archive that keeps its history in process memory.
///
/// Nothing survives the process, so this backend is only useful for tests and
/// local experiments. It follows the same history policy as a durable backend
/// and ignores versions it already holds. Clones share one store, so a test
/// can keep a clone and inspect what an invocation archived.
#[derive(Debug, Clone, Default)]
pub struct MemoryArchive {
    store: Arc<Mutex<Vec<Vec<u8>>>>,
    settings: Settings,
    closed: bool,
}

impl MemoryArchive {
    /// Creates an empty archive.
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Creates an archive holding `history`, oldest first.
    #[must_use]
    pub fn with_history<I, V>(history: I, settings: Settings) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Vec<u8>>,
    {
        let entries = history.into_iter().map(Into::into).collect();
        Self {
            store: Arc::new(Mutex::new(entries)),
            settings,
            closed: false,
        }
    }

    /// Creates an archive from its configuration section.
    #[must_use]
    pub fn from_config(config: &MemoryConfig, settings: Settings) -> Self {
        Self::with_history(config.history.iter().map(String::as_bytes), settings)
    }

    /// Returns a copy of every stored entry, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<Vec<u8>> {
        self.lock().clone()
    }

    /// Returns the stored entries decoded as UTF-8, replacing invalid bytes.
    #[must_use]
    pub fn entries_lossy(&self) -> Vec<String> {
        self.lock()
            .iter()
            .map(|entry| String::from_utf8_lossy(entry).into_owned())
            .collect()
    }

    /// Returns `true` once this handle has been closed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Vec<u8>>> {
        match self.store.lock() {
            Ok(store) => store,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    const fn ensure_open(&self) -> Result<(), ArchiveError> {
        if self.closed {
            return Err(ArchiveError::Closed);
        }
        Ok(())
    }
}

impl Archive for MemoryArchive {
    fn close(&mut self, _ctx: &Context) -> Result<(), ArchiveError> {
        self.closed = true;
        Ok(())
    }

    fn history(
        &mut self,
        _ctx: &Context,
        latest: Option<Vec<u8>>,
    ) -> Result<Vec<Vec<u8>>, ArchiveError> {
        self.ensure_open()?;
        if latest.is_some() && !self.settings.force_history {
            debug!(target: ARCHIVE_TARGET, "latest version known, skipping history");
            return Ok(Vec::new());
        }
        Ok(self.entries())
    }

    fn put(&mut self, _ctx: &Context, versions: &[Vec<u8>]) -> Result<(), ArchiveError> {
        self.ensure_open()?;
        let strategy = self.settings.fingerprint;
        let mut store = self.lock();
        let mut seen: HashSet<_> = store
            .iter()
            .map(|entry| strategy.fingerprint(entry))
            .collect();
        for version in versions {
            if seen.insert(strategy.fingerprint(version)) {
                store.push(version.clone());
            }
        }
        Ok(())
    }

    fn fingerprint(&self) -> FingerprintStrategy {
        self.settings.fingerprint
    }
}
