// Local store: a single owner thread holds the backend and runs one job at a
// time, so every read-modify-write on a collection is applied atomically with
// respect to other callers.

use crate::data::{Database, KeyValueBackend};
use crate::error::StoreError;
use crate::model::{
    Backlink, Collection, LinkStatus, SiteConfig, StorageSnapshot, StoredRecord, backlink_key,
    keyword_key, subdomain_key,
};
use linkpilot_scanner::{KeywordRecord, SubdomainRecord};
use linkpilot_scanner::result::now_millis;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

type Job = Box<dyn FnOnce(&mut dyn KeyValueBackend) + Send>;

const JOB_QUEUE_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Added,
    Updated,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub added: usize,
    pub updated: usize,
}

/// Cloneable handle to the store's owner thread.
#[derive(Clone)]
pub struct LocalStore {
    jobs: mpsc::Sender<Job>,
}

impl LocalStore {
    /// Start the owner thread for a backend.
    pub fn spawn<B: KeyValueBackend + 'static>(backend: B) -> Result<Self, StoreError> {
        let (tx, mut rx) = mpsc::channel::<Job>(JOB_QUEUE_DEPTH);

        std::thread::Builder::new()
            .name("linkpilot-store".to_string())
            .spawn(move || {
                let mut backend = backend;
                while let Some(job) = rx.blocking_recv() {
                    job(&mut backend);
                }
                debug!("Local store owner exiting");
            })?;

        Ok(Self { jobs: tx })
    }

    /// Open (or create) the SQLite-backed store at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let db = Database::new(path)?;
        info!("Local store opened at {}", path.display());
        Self::spawn(db)
    }

    async fn run<R, F>(&self, job: F) -> Result<R, StoreError>
    where
        R: Send + 'static,
        F: FnOnce(&mut dyn KeyValueBackend) -> Result<R, StoreError> + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move |backend| {
            let result = panic::catch_unwind(AssertUnwindSafe(|| job(backend)))
                .unwrap_or_else(|payload| Err(StoreError::JobPanicked(panic_reason(payload))));
            if let Err(ref e) = result {
                error!("Store operation failed: {}", e);
            }
            let _ = reply_tx.send(result);
        });

        self.jobs.send(job).await.map_err(|_| StoreError::Closed)?;
        reply_rx.await.map_err(|_| StoreError::Closed)?
    }

    // Raw collection access

    /// Current value of a collection, or its empty default when never written.
    pub async fn get(&self, collection: Collection) -> Result<Value, StoreError> {
        self.run(move |backend| read_value(backend, collection)).await
    }

    /// Overwrite a collection in one write.
    pub async fn set(&self, collection: Collection, value: Value) -> Result<(), StoreError> {
        self.run(move |backend| backend.set(collection.key(), &value))
            .await
    }

    /// Stored bytes of a collection, `None` when never written.
    pub async fn raw(&self, collection: Collection) -> Result<Option<String>, StoreError> {
        self.run(move |backend| backend.get_raw(collection.key()))
            .await
    }

    // Typed collection access

    pub async fn list<T: StoredRecord>(&self) -> Result<Vec<T>, StoreError> {
        self.run(|backend| read_records::<T>(backend)).await
    }

    /// Insert or replace one record matched by `key_fn`.
    ///
    /// A replacement keeps the stored `created_at` and gets an `updated_at`
    /// strictly greater than the one it replaces; a new record gets both
    /// stamps set to now.
    pub async fn upsert_by_key<T, F>(&self, record: T, key_fn: F) -> Result<UpsertOutcome, StoreError>
    where
        T: StoredRecord,
        F: Fn(&T) -> String + Send + 'static,
    {
        self.run(move |backend| {
            let mut records = read_records::<T>(backend)?;
            let outcome = upsert_in(&mut records, record, &key_fn, now_millis());
            write_records(backend, &records)?;
            debug!("Upsert into {}: {:?}", T::COLLECTION, outcome);
            Ok(outcome)
        })
        .await
    }

    /// Upsert many records in one read-modify-write cycle.
    ///
    /// Records are applied in order, so a key repeated inside the batch is
    /// counted as an update against its earlier occurrence.
    pub async fn batch_upsert<T, F>(&self, batch: Vec<T>, key_fn: F) -> Result<BatchOutcome, StoreError>
    where
        T: StoredRecord,
        F: Fn(&T) -> String + Send + 'static,
    {
        self.run(move |backend| {
            let mut records = read_records::<T>(backend)?;
            let now = now_millis();
            let mut outcome = BatchOutcome::default();
            for record in batch {
                match upsert_in(&mut records, record, &key_fn, now) {
                    UpsertOutcome::Added => outcome.added += 1,
                    UpsertOutcome::Updated => outcome.updated += 1,
                }
            }
            write_records(backend, &records)?;
            info!(
                "Batch upsert into {}: {} added, {} updated",
                T::COLLECTION,
                outcome.added,
                outcome.updated
            );
            Ok(outcome)
        })
        .await
    }

    /// Remove every record whose key equals `key`. Nothing is written when no
    /// record matches.
    pub async fn delete_by_key<T, F>(&self, key: String, key_fn: F) -> Result<bool, StoreError>
    where
        T: StoredRecord,
        F: Fn(&T) -> String + Send + 'static,
    {
        self.run(move |backend| {
            let mut records = read_records::<T>(backend)?;
            let before = records.len();
            records.retain(|record| key_fn(record) != key);
            if records.len() == before {
                debug!("No {} record with key '{}'", T::COLLECTION, key);
                return Ok(false);
            }
            write_records(backend, &records)?;
            Ok(true)
        })
        .await
    }

    /// Wipe every collection.
    pub async fn clear_all(&self) -> Result<(), StoreError> {
        self.run(|backend| {
            backend.clear()?;
            warn!("All stored data cleared");
            Ok(())
        })
        .await
    }

    /// Write the default value of each collection that has never been written.
    /// Returns the collections that were initialized.
    pub async fn initialize(&self) -> Result<Vec<Collection>, StoreError> {
        self.run(|backend| {
            let mut initialized = Vec::new();
            for collection in Collection::ALL {
                if !backend.contains(collection.key())? {
                    backend.set(collection.key(), &collection.default_value())?;
                    initialized.push(collection);
                }
            }
            if !initialized.is_empty() {
                info!("Initialized collections: {:?}", initialized);
            }
            Ok(initialized)
        })
        .await
    }

    // Domain helpers

    pub async fn site_config(&self) -> Result<SiteConfig, StoreError> {
        self.run(|backend| match backend.get(Collection::SiteConfig.key())? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(SiteConfig::default()),
        })
        .await
    }

    pub async fn save_site_config(&self, config: SiteConfig) -> Result<(), StoreError> {
        self.run(move |backend| {
            backend.set(Collection::SiteConfig.key(), &serde_json::to_value(&config)?)
        })
        .await
    }

    pub async fn add_backlink(&self, backlink: Backlink) -> Result<UpsertOutcome, StoreError> {
        self.upsert_by_key(backlink, backlink_key).await
    }

    /// Set the status of the backlink with `id`. Returns false when no
    /// backlink has that id.
    pub async fn update_backlink_status(
        &self,
        id: String,
        status: LinkStatus,
        error: Option<String>,
    ) -> Result<bool, StoreError> {
        self.run(move |backend| {
            let mut backlinks = read_records::<Backlink>(backend)?;
            let Some(link) = backlinks.iter_mut().find(|link| link.id == id) else {
                return Ok(false);
            };
            link.status = status;
            link.error = error;
            link.updated_at = now_millis().max(link.updated_at.saturating_add(1));
            write_records(backend, &backlinks)?;
            info!("Backlink {} is now {}", id, status);
            Ok(true)
        })
        .await
    }

    pub async fn save_keyword(&self, record: KeywordRecord) -> Result<UpsertOutcome, StoreError> {
        self.upsert_by_key(record, keyword_key).await
    }

    pub async fn add_subdomains_batch(
        &self,
        records: Vec<SubdomainRecord>,
    ) -> Result<BatchOutcome, StoreError> {
        self.batch_upsert(records, subdomain_key).await
    }

    pub async fn delete_subdomain(&self, domain: String) -> Result<bool, StoreError> {
        self.delete_by_key::<SubdomainRecord, _>(domain, subdomain_key)
            .await
    }

    /// Every collection, read in one job.
    pub async fn export_all(&self) -> Result<StorageSnapshot, StoreError> {
        self.run(|backend| {
            let site_config = match backend.get(Collection::SiteConfig.key())? {
                Some(value) => serde_json::from_value(value)?,
                None => SiteConfig::default(),
            };
            Ok(StorageSnapshot {
                backlinks: read_records(backend)?,
                site_config,
                keywords: read_records(backend)?,
                subdomains: read_records(backend)?,
            })
        })
        .await
    }
}

fn read_value(backend: &dyn KeyValueBackend, collection: Collection) -> Result<Value, StoreError> {
    Ok(backend
        .get(collection.key())?
        .unwrap_or_else(|| collection.default_value()))
}

fn read_records<T: StoredRecord>(backend: &dyn KeyValueBackend) -> Result<Vec<T>, StoreError> {
    match backend.get(T::COLLECTION.key())? {
        Some(Value::Null) | None => Ok(Vec::new()),
        Some(value) => Ok(deserialize_list(value)?),
    }
}

fn deserialize_list<T: DeserializeOwned>(value: Value) -> Result<Vec<T>, serde_json::Error> {
    serde_json::from_value(value)
}

fn write_records<T: StoredRecord>(
    backend: &mut dyn KeyValueBackend,
    records: &[T],
) -> Result<(), StoreError> {
    backend.set(T::COLLECTION.key(), &serde_json::to_value(records)?)
}

/// Message carried by a caught panic payload.
pub(crate) fn panic_reason(payload: Box<dyn Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Apply one upsert to an in-memory collection.
pub fn upsert_in<T, F>(records: &mut Vec<T>, mut record: T, key_fn: &F, now: i64) -> UpsertOutcome
where
    T: StoredRecord,
    F: Fn(&T) -> String,
{
    let key = key_fn(&record);
    match records.iter().position(|existing| key_fn(existing) == key) {
        Some(index) => {
            let previous = &records[index];
            let updated_at = now.max(previous.updated_at().saturating_add(1));
            record.set_timestamps(previous.created_at(), updated_at);
            records[index] = record;
            UpsertOutcome::Updated
        }
        None => {
            record.set_timestamps(now, now);
            records.push(record);
            UpsertOutcome::Added
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MemoryBackend;

    fn backlink(id: &str, status: LinkStatus) -> Backlink {
        let mut link = Backlink::new(id, "https://a.com");
        link.status = status;
        link
    }

    #[test]
    fn test_upsert_in_appends_then_replaces() {
        let mut records = Vec::new();
        assert_eq!(
            upsert_in(&mut records, backlink("1", LinkStatus::Pending), &backlink_key, 100),
            UpsertOutcome::Added
        );
        assert_eq!(records[0].created_at, 100);
        assert_eq!(records[0].updated_at, 100);

        // Same millisecond still moves updated_at forward
        assert_eq!(
            upsert_in(&mut records, backlink("1", LinkStatus::Success), &backlink_key, 100),
            UpsertOutcome::Updated
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, LinkStatus::Success);
        assert_eq!(records[0].created_at, 100);
        assert_eq!(records[0].updated_at, 101);
    }

    #[test]
    fn test_upsert_in_saturates_at_max_timestamp() {
        let mut stale = backlink("1", LinkStatus::Pending);
        stale.updated_at = i64::MAX;
        let mut records = vec![stale];

        assert_eq!(
            upsert_in(&mut records, backlink("1", LinkStatus::Success), &backlink_key, 100),
            UpsertOutcome::Updated
        );
        assert_eq!(records[0].updated_at, i64::MAX);
    }

    #[tokio::test]
    async fn test_panicking_job_leaves_store_running() {
        let store = LocalStore::spawn(MemoryBackend::new()).unwrap();

        let result: Result<(), StoreError> = store.run(|_| panic!("boom")).await;
        assert!(matches!(result, Err(StoreError::JobPanicked(ref reason)) if reason == "boom"));

        store.add_backlink(backlink("1", LinkStatus::Pending)).await.unwrap();
        let links: Vec<Backlink> = store.list().await.unwrap();
        assert_eq!(links.len(), 1);
    }

    #[tokio::test]
    async fn test_get_returns_defaults_before_initialize() {
        let store = LocalStore::spawn(MemoryBackend::new()).unwrap();
        assert_eq!(store.get(Collection::Subdomains).await.unwrap(), Value::Array(vec![]));
        assert_eq!(store.site_config().await.unwrap(), SiteConfig::default());
        assert_eq!(store.raw(Collection::Subdomains).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_backlink_status() {
        let store = LocalStore::spawn(MemoryBackend::new()).unwrap();
        store.add_backlink(backlink("1", LinkStatus::Pending)).await.unwrap();

        let found = store
            .update_backlink_status("1".into(), LinkStatus::Failed, Some("captcha".into()))
            .await
            .unwrap();
        assert!(found);
        let missing = store
            .update_backlink_status("2".into(), LinkStatus::Success, None)
            .await
            .unwrap();
        assert!(!missing);

        let links: Vec<Backlink> = store.list().await.unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].status, LinkStatus::Failed);
        assert_eq!(links[0].error.as_deref(), Some("captcha"));
        assert!(links[0].updated_at > links[0].created_at);
    }
}
