use async_trait::async_trait;
use missao_sync::merge::merge_into;
use missao_sync::seed::{CredentialSeeder, SeedCredential, SeedError, SeedOutcome};
use missao_sync::store::{DocumentStore, StoreError, WriteMode, WriteOp, MAX_BATCH_WRITES};
use missao_sync::types::{Collection, Record};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

// --- In-Memory Document Store ---

/// A failure the store will report on upcoming calls.
#[derive(Clone, Debug)]
pub enum InjectedFailure {
    /// A retryable failure (`StoreError::Unavailable`).
    Transient,
    /// A non-retryable failure (`StoreError::Rejected`).
    Permanent,
}

impl InjectedFailure {
    fn to_error(&self, what: &str) -> StoreError {
        match self {
            InjectedFailure::Transient => {
                StoreError::Unavailable(format!("injected transient failure on {what}"))
            }
            InjectedFailure::Permanent => {
                StoreError::Rejected(format!("injected permanent failure on {what}"))
            }
        }
    }
}

#[derive(Default, Debug)]
struct Inner {
    collections: BTreeMap<String, Collection>,
    /// `(collection, batch size)` for every successful commit, in order.
    commits: Vec<(String, usize)>,
    fetches: Vec<String>,
    /// Per collection: commits to let through before failing, and the failures to report.
    commit_failures: HashMap<String, (usize, Vec<InjectedFailure>)>,
    fetch_failures: HashMap<String, Vec<InjectedFailure>>,
}

/// A `DocumentStore` held in memory, with merge semantics matching Firestore,
/// commit accounting, and failure injection.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `fields` under `collection/key`, replacing any existing record.
    pub fn put(&self, collection: &str, key: &str, fields: Value) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), into_record(fields));
    }

    /// Stores `count` generated records in `collection`.
    pub fn fill(&self, collection: &str, count: usize) {
        for i in 0..count {
            self.put(
                collection,
                &format!("{collection}-{i:05}"),
                serde_json::json!({ "seq": i, "collection": collection }),
            );
        }
    }

    pub fn get(&self, collection: &str, key: &str) -> Option<Record> {
        let inner = self.inner.lock().unwrap();
        inner.collections.get(collection)?.get(key).cloned()
    }

    /// The full content of `collection` (empty if it was never written).
    pub fn collection(&self, collection: &str) -> Collection {
        let inner = self.inner.lock().unwrap();
        inner.collections.get(collection).cloned().unwrap_or_default()
    }

    /// The full content of every collection that holds records.
    pub fn dump(&self) -> BTreeMap<String, Collection> {
        let inner = self.inner.lock().unwrap();
        inner
            .collections
            .iter()
            .filter(|(_, records)| !records.is_empty())
            .map(|(name, records)| (name.clone(), records.clone()))
            .collect()
    }

    /// Sizes of every successful commit to `collection`, in order.
    pub fn commits_for(&self, collection: &str) -> Vec<usize> {
        let inner = self.inner.lock().unwrap();
        inner
            .commits
            .iter()
            .filter(|(name, _)| name == collection)
            .map(|(_, size)| *size)
            .collect()
    }

    pub fn total_commits(&self) -> usize {
        self.inner.lock().unwrap().commits.len()
    }

    pub fn fetch_count(&self) -> usize {
        self.inner.lock().unwrap().fetches.len()
    }

    /// Lets `succeed_first` commits to `collection` through, then reports
    /// `failures` one per call before recovering.
    pub fn fail_commits(
        &self,
        collection: &str,
        succeed_first: usize,
        failures: Vec<InjectedFailure>,
    ) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .commit_failures
            .insert(collection.to_string(), (succeed_first, failures));
    }

    /// Reports `failures` on the next fetches of `collection`.
    pub fn fail_fetches(&self, collection: &str, failures: Vec<InjectedFailure>) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .fetch_failures
            .insert(collection.to_string(), failures);
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn fetch_collection(&self, collection: &str) -> Result<Collection, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.fetches.push(collection.to_string());
        if let Some(failures) = inner.fetch_failures.get_mut(collection) {
            if !failures.is_empty() {
                let failure = failures.remove(0);
                return Err(failure.to_error(&format!("fetch {collection}")));
            }
        }
        Ok(inner
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default())
    }

    async fn commit_batch(&self, collection: &str, writes: &[WriteOp]) -> Result<(), StoreError> {
        if writes.len() > MAX_BATCH_WRITES {
            return Err(StoreError::BatchTooLarge {
                size: writes.len(),
                limit: MAX_BATCH_WRITES,
            });
        }

        let mut inner = self.inner.lock().unwrap();
        if let Some((succeed_first, failures)) = inner.commit_failures.get_mut(collection) {
            if *succeed_first > 0 {
                *succeed_first -= 1;
            } else if !failures.is_empty() {
                let failure = failures.remove(0);
                return Err(failure.to_error(&format!("commit {collection}")));
            }
        }

        let records = inner
            .collections
            .entry(collection.to_string())
            .or_default();
        for write in writes {
            match write.mode {
                WriteMode::Overwrite => {
                    records.insert(write.key.clone(), write.fields.clone());
                }
                WriteMode::Merge => {
                    merge_into(records.entry(write.key.clone()).or_default(), &write.fields);
                }
            }
        }
        inner.commits.push((collection.to_string(), writes.len()));
        Ok(())
    }
}

// --- Mock Credential Seeder ---

/// A `CredentialSeeder` that remembers accounts in memory, or fails on demand.
#[derive(Clone, Debug, Default)]
pub struct MockSeeder {
    accounts: Arc<Mutex<HashMap<String, SeedCredential>>>,
    unreachable: bool,
}

impl MockSeeder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A seeder that behaves like an auth emulator that is not running.
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    pub fn account(&self, uid: &str) -> Option<SeedCredential> {
        self.accounts.lock().unwrap().get(uid).cloned()
    }

    pub fn account_count(&self) -> usize {
        self.accounts.lock().unwrap().len()
    }
}

#[async_trait]
impl CredentialSeeder for MockSeeder {
    async fn ensure(&self, seed: &SeedCredential) -> Result<SeedOutcome, SeedError> {
        if self.unreachable {
            return Err(SeedError::Unreachable(
                "connection refused (127.0.0.1:9099)".to_string(),
            ));
        }
        let mut accounts = self.accounts.lock().unwrap();
        let outcome = if accounts.contains_key(&seed.uid) {
            SeedOutcome::PasswordReset
        } else {
            SeedOutcome::Created
        };
        accounts.insert(seed.uid.clone(), seed.clone());
        Ok(outcome)
    }
}

// --- Fixtures ---

/// Converts a JSON object literal into a `Record`.
///
/// # Panics
/// Panics if `value` is not an object.
pub fn into_record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("a record must be a JSON object, got: {other}"),
    }
}

/// Fills a store with a small, realistic mission dataset touching every
/// tracked collection except `notifications`, which stays empty.
pub fn seed_mission_dataset(store: &MemoryStore) {
    use serde_json::json;

    store.put(
        "items",
        "item-dipirona",
        json!({ "name": "Dipirona 500mg", "qty": 120, "unit": "cx" }),
    );
    store.put(
        "items",
        "item-luvas",
        json!({ "name": "Luvas M", "qty": 40, "tags": ["epi", "descartável"] }),
    );
    store.put(
        "missions",
        "missao-2025-sertao",
        json!({
            "title": "Missão Sertão",
            "items": ["item-dipirona", "item-luvas"],
            "startsAt": { "_seconds": 1735725600, "_nanoseconds": 0 },
            "location": { "city": "Petrolina", "state": "PE" }
        }),
    );
    store.put(
        "attendances",
        "att-1",
        json!({ "mission": "missao-2025-sertao", "volunteer": "vol-ana" }),
    );
    store.put(
        "beneficiaries",
        "ben-1",
        json!({ "name": "José", "birthYear": 1961, "notes": null }),
    );
    store.put(
        "volunteers",
        "vol-ana",
        json!({ "name": "Ana", "role": "enfermeira", "active": true }),
    );
    store.put(
        "patient_visits",
        "visit-1",
        json!({ "beneficiary": "ben-1", "stage": "triage", "vitals": { "bp": "12x8", "temp": 36.7 } }),
    );
    store.put(
        "transactions",
        "tx-1",
        json!({ "amount": 150.25, "kind": "donation" }),
    );
    store.put(
        "users",
        "operador-missao",
        json!({ "role": "admin", "email": "operador@missao.local" }),
    );
}
