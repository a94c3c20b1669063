use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::listing::{ListingError, RegionListing};
use crate::resources::{RegionMap, ResourceKind};
use crate::store::KeyValueStore;

const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// Shared cache configuration.
///
/// `stale_after` is display metadata only: fetches are strictly
/// operator-initiated and staleness never auto-triggers a refetch.
/// `persist_ttl` bounds how old a persisted snapshot may be and still be
/// eligible for hydration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub stale_after: Duration,
    pub persist_ttl: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            stale_after: Duration::minutes(5),
            persist_ttl: Duration::hours(24),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Empty,
    Hydrated,
    Fetching,
    Fresh,
    Error,
}

impl CacheStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Hydrated => "hydrated",
            Self::Fetching => "fetching",
            Self::Fresh => "fresh",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct SnapshotDocument<T> {
    version: u32,
    #[serde(default)]
    fetched_at: Option<DateTime<Utc>>,
    data: RegionMap<T>,
}

#[derive(Debug, Serialize)]
struct SnapshotDocumentRef<'a, T> {
    version: u32,
    fetched_at: Option<DateTime<Utc>>,
    data: &'a RegionMap<T>,
}

/// Per-resource-type cache: in-memory snapshot, staleness clock, and
/// write-through persistence.
///
/// One instance exists per resource kind; instances share nothing beyond
/// (possibly) the underlying store, each under its own key. The cache does
/// not serialize concurrent refreshes; the UI disables its trigger while
/// `is_fetching()` is true, and overlapping calls are last-write-wins.
#[derive(Debug)]
pub struct ResourceCache<T, S, L> {
    kind: ResourceKind,
    policy: CachePolicy,
    store: S,
    listing: L,
    data: RegionMap<T>,
    fetched_at: Option<DateTime<Utc>>,
    status: CacheStatus,
    last_error: Option<ListingError>,
}

impl<T, S, L> ResourceCache<T, S, L>
where
    T: Serialize + DeserializeOwned,
    S: KeyValueStore,
    L: RegionListing<T>,
{
    pub fn new(kind: ResourceKind, policy: CachePolicy, store: S, listing: L) -> Self {
        Self {
            kind,
            policy,
            store,
            listing,
            data: RegionMap::new(),
            fetched_at: None,
            status: CacheStatus::Empty,
            last_error: None,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    #[must_use]
    pub fn status(&self) -> CacheStatus {
        self.status
    }

    #[must_use]
    pub fn is_fetching(&self) -> bool {
        self.status == CacheStatus::Fetching
    }

    #[must_use]
    pub fn snapshot(&self) -> &RegionMap<T> {
        &self.data
    }

    #[must_use]
    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&ListingError> {
        self.last_error.as_ref()
    }

    /// Display metadata only; never consulted to trigger a refetch.
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        match self.fetched_at {
            Some(fetched_at) => now - fetched_at > self.policy.stale_after,
            None => true,
        }
    }

    /// Restores the persisted snapshot, if any. Never errors: a snapshot
    /// that fails to parse or has outlived `persist_ttl` is purged and the
    /// cache stays `Empty`.
    pub fn hydrate(&mut self) -> CacheStatus {
        self.hydrate_at(Utc::now())
    }

    pub fn hydrate_at(&mut self, now: DateTime<Utc>) -> CacheStatus {
        let key = self.kind.storage_key();
        let Some(raw) = self.store.get(key) else {
            return self.status;
        };

        let (data, fetched_at) = match serde_json::from_str::<SnapshotDocument<T>>(&raw) {
            Ok(document) if document.version == SNAPSHOT_SCHEMA_VERSION => {
                (document.data, document.fetched_at)
            }
            // Bare region maps predate the snapshot document; accept them
            // with an unknown fetch time.
            _ => match serde_json::from_str::<RegionMap<T>>(&raw) {
                Ok(data) => (data, None),
                Err(error) => {
                    tracing::warn!(
                        kind = self.kind.as_str(),
                        %error,
                        "purging unparseable persisted snapshot"
                    );
                    self.store.remove(key);
                    return self.status;
                }
            },
        };

        if let Some(fetched_at) = fetched_at
            && now - fetched_at > self.policy.persist_ttl
        {
            tracing::debug!(
                kind = self.kind.as_str(),
                "persisted snapshot outlived its ttl, purging"
            );
            self.store.remove(key);
            return self.status;
        }

        self.data = data;
        self.fetched_at = fetched_at;
        self.status = CacheStatus::Hydrated;
        self.status
    }

    /// Fetches unconditionally, replacing the snapshot in memory and in
    /// the store on success. On failure the last-known-good snapshot is
    /// left untouched in both places and the error is surfaced.
    pub async fn refresh(&mut self) -> Result<&RegionMap<T>, ListingError> {
        self.status = CacheStatus::Fetching;
        match self.listing.list_by_region().await {
            Ok(data) => {
                self.data = data;
                self.fetched_at = Some(Utc::now());
                self.last_error = None;
                self.persist();
                self.status = CacheStatus::Fresh;
                tracing::debug!(
                    kind = self.kind.as_str(),
                    regions = self.data.len(),
                    "snapshot replaced"
                );
                Ok(&self.data)
            }
            Err(error) => {
                self.status = CacheStatus::Error;
                self.last_error = Some(error.clone());
                Err(error)
            }
        }
    }

    /// Drops the snapshot from memory and from the store.
    pub fn purge(&mut self) {
        self.store.remove(self.kind.storage_key());
        self.data = RegionMap::new();
        self.fetched_at = None;
        self.status = CacheStatus::Empty;
        self.last_error = None;
    }

    fn persist(&self) {
        let document = SnapshotDocumentRef {
            version: SNAPSHOT_SCHEMA_VERSION,
            fetched_at: self.fetched_at,
            data: &self.data,
        };
        match serde_json::to_string(&document) {
            Ok(serialized) => self.store.set(self.kind.storage_key(), &serialized),
            Err(error) => {
                tracing::warn!(
                    kind = self.kind.as_str(),
                    %error,
                    "failed to serialize snapshot, skipping persistence"
                );
            }
        }
    }
}
