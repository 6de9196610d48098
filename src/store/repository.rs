use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::error::StoreError;
use crate::concurrency::{next_timestamp, Clock};
use crate::models::{Cdn, CdnId, DeliveryService, DeliveryServiceId, Tenant, TenantId};

/// A persisted record with an integer identity, an optional owning tenant and
/// a last-modified stamp maintained by the store.
pub trait StoredRecord: Clone + Send + Sync + 'static {
    type Id: Copy + Ord + Display + From<i32> + Into<i32> + Send + Sync;

    const KIND: &'static str;

    fn id(&self) -> Self::Id;
    fn set_id(&mut self, id: Self::Id);
    fn last_updated(&self) -> DateTime<Utc>;
    fn set_last_updated(&mut self, at: DateTime<Utc>);
    /// Owning tenant (for tenants, the parent). `None` for tenant-agnostic records.
    fn parent(&self) -> Option<TenantId>;
    /// Unique human key: tenant name, Delivery Service xmlId, CDN name
    fn natural_key(&self) -> &str;

    /// `parent()` points at a row of the same table. Writes that would orphan
    /// a row or close a parent cycle are refused.
    const NESTED: bool = false;
}

impl StoredRecord for Tenant {
    type Id = TenantId;
    const KIND: &'static str = "tenant";
    const NESTED: bool = true;

    fn id(&self) -> TenantId {
        self.id
    }
    fn set_id(&mut self, id: TenantId) {
        self.id = id;
    }
    fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }
    fn set_last_updated(&mut self, at: DateTime<Utc>) {
        self.last_updated = at;
    }
    fn parent(&self) -> Option<TenantId> {
        // the root is not its own child
        (!self.is_root()).then_some(self.parent_id)
    }
    fn natural_key(&self) -> &str {
        &self.name
    }
}

impl StoredRecord for DeliveryService {
    type Id = DeliveryServiceId;
    const KIND: &'static str = "deliveryservice";

    fn id(&self) -> DeliveryServiceId {
        self.id
    }
    fn set_id(&mut self, id: DeliveryServiceId) {
        self.id = id;
    }
    fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }
    fn set_last_updated(&mut self, at: DateTime<Utc>) {
        self.last_updated = at;
    }
    fn parent(&self) -> Option<TenantId> {
        Some(self.tenant_id)
    }
    fn natural_key(&self) -> &str {
        &self.xml_id
    }
}

impl StoredRecord for Cdn {
    type Id = CdnId;
    const KIND: &'static str = "cdn";

    fn id(&self) -> CdnId {
        self.id
    }
    fn set_id(&mut self, id: CdnId) {
        self.id = id;
    }
    fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }
    fn set_last_updated(&mut self, at: DateTime<Utc>) {
        self.last_updated = at;
    }
    fn parent(&self) -> Option<TenantId> {
        None
    }
    fn natural_key(&self) -> &str {
        &self.name
    }
}

/// Persistence operations the core relies on. Conditional replace and delete
/// are atomic compare-and-swap operations on the last-modified stamp.
#[async_trait]
pub trait Repository<T: StoredRecord>: Send + Sync {
    async fn get(&self, id: T::Id) -> Result<Option<T>, StoreError>;

    async fn find_by_key(&self, key: &str) -> Result<Option<T>, StoreError>;

    async fn list(&self) -> Result<Vec<T>, StoreError>;

    async fn list_by_parent(&self, parent: TenantId) -> Result<Vec<T>, StoreError>;

    /// Assigns an id and a commit stamp
    async fn insert(&self, record: T) -> Result<T, StoreError>;

    /// Replaces the record with the same id if its stamp still equals `expected`
    async fn replace_if_unmodified(&self, expected: DateTime<Utc>, record: T) -> Result<T, StoreError>;

    async fn delete_if_unmodified(&self, id: T::Id, expected: DateTime<Utc>) -> Result<T, StoreError>;
}

struct TableState<T: StoredRecord> {
    rows: BTreeMap<T::Id, T>,
    next_id: i32,
    last_stamp: Option<DateTime<Utc>>,
}

/// In-memory repository for one record kind.
pub struct Table<T: StoredRecord> {
    state: RwLock<TableState<T>>,
    clock: Arc<dyn Clock>,
    min_advance: Duration,
}

impl<T: StoredRecord> Table<T> {
    pub fn new(clock: Arc<dyn Clock>, min_advance: Duration) -> Self {
        Self::seeded(Vec::new(), clock, min_advance)
    }

    /// Starts the table with records whose ids are already assigned
    pub fn seeded(records: Vec<T>, clock: Arc<dyn Clock>, min_advance: Duration) -> Self {
        let mut rows = BTreeMap::new();
        let mut next_id = 1;
        let mut last_stamp = None;
        for record in records {
            let raw: i32 = record.id().into();
            next_id = next_id.max(raw + 1);
            last_stamp = last_stamp.max(Some(record.last_updated()));
            rows.insert(record.id(), record);
        }

        Self {
            state: RwLock::new(TableState {
                rows,
                next_id,
                last_stamp,
            }),
            clock,
            min_advance,
        }
    }

    fn stamp(&self, state: &mut TableState<T>) -> DateTime<Utc> {
        let at = next_timestamp(state.last_stamp, self.clock.now(), self.min_advance);
        state.last_stamp = Some(at);
        at
    }

    fn row_id(parent: TenantId) -> T::Id {
        T::Id::from(parent.0)
    }

    /// Rejects a missing parent and, when `id` is given, a parent chain that leads back to it
    fn check_hierarchy(state: &TableState<T>, record: &T, id: Option<T::Id>) -> Result<(), StoreError> {
        let Some(parent) = record.parent() else {
            return Ok(());
        };
        if !state.rows.contains_key(&Self::row_id(parent)) {
            return Err(StoreError::NotFound {
                kind: T::KIND,
                key: parent.to_string(),
            });
        }

        let mut cursor = Some(Self::row_id(parent));
        let mut steps = 0;
        while let Some(at) = cursor {
            if Some(at) == id {
                return Err(StoreError::Conflict {
                    kind: T::KIND,
                    key: at.to_string(),
                });
            }
            steps += 1;
            if steps > state.rows.len() {
                return Err(StoreError::Corrupt(format!("{} {} has a cyclic parent chain", T::KIND, at)));
            }
            cursor = state.rows.get(&at).and_then(|row| row.parent()).map(Self::row_id);
        }
        Ok(())
    }

    fn key_taken(state: &TableState<T>, key: &str, except: Option<T::Id>) -> bool {
        state
            .rows
            .values()
            .any(|r| r.natural_key() == key && Some(r.id()) != except)
    }
}

#[async_trait]
impl<T: StoredRecord> Repository<T> for Table<T> {
    async fn get(&self, id: T::Id) -> Result<Option<T>, StoreError> {
        let state = self.state.read().await;
        Ok(state.rows.get(&id).cloned())
    }

    async fn find_by_key(&self, key: &str) -> Result<Option<T>, StoreError> {
        let state = self.state.read().await;
        Ok(state.rows.values().find(|r| r.natural_key() == key).cloned())
    }

    async fn list(&self) -> Result<Vec<T>, StoreError> {
        let state = self.state.read().await;
        Ok(state.rows.values().cloned().collect())
    }

    async fn list_by_parent(&self, parent: TenantId) -> Result<Vec<T>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .rows
            .values()
            .filter(|r| r.parent() == Some(parent))
            .cloned()
            .collect())
    }

    async fn insert(&self, mut record: T) -> Result<T, StoreError> {
        let mut state = self.state.write().await;
        if Self::key_taken(&state, record.natural_key(), None) {
            return Err(StoreError::Duplicate {
                kind: T::KIND,
                key: record.natural_key().to_string(),
            });
        }
        if T::NESTED {
            Self::check_hierarchy(&state, &record, None)?;
        }

        let id = T::Id::from(state.next_id);
        state.next_id += 1;
        record.set_id(id);
        let at = self.stamp(&mut state);
        record.set_last_updated(at);
        state.rows.insert(id, record.clone());

        tracing::debug!("Inserted {} {} at {}", T::KIND, id, at);
        Ok(record)
    }

    async fn replace_if_unmodified(&self, expected: DateTime<Utc>, mut record: T) -> Result<T, StoreError> {
        let mut state = self.state.write().await;
        let id = record.id();
        let current = state.rows.get(&id).ok_or_else(|| StoreError::NotFound {
            kind: T::KIND,
            key: id.to_string(),
        })?;

        if current.last_updated() != expected {
            return Err(StoreError::Conflict {
                kind: T::KIND,
                key: id.to_string(),
            });
        }
        if Self::key_taken(&state, record.natural_key(), Some(id)) {
            return Err(StoreError::Duplicate {
                kind: T::KIND,
                key: record.natural_key().to_string(),
            });
        }
        if T::NESTED {
            Self::check_hierarchy(&state, &record, Some(id))?;
        }

        let at = self.stamp(&mut state);
        record.set_last_updated(at);
        state.rows.insert(id, record.clone());

        tracing::debug!("Replaced {} {} at {}", T::KIND, id, at);
        Ok(record)
    }

    async fn delete_if_unmodified(&self, id: T::Id, expected: DateTime<Utc>) -> Result<T, StoreError> {
        let mut state = self.state.write().await;
        let current = state.rows.get(&id).ok_or_else(|| StoreError::NotFound {
            kind: T::KIND,
            key: id.to_string(),
        })?;
        if current.last_updated() != expected {
            return Err(StoreError::Conflict {
                kind: T::KIND,
                key: id.to_string(),
            });
        }
        if T::NESTED {
            let raw: i32 = id.into();
            let children: Vec<i32> = state
                .rows
                .values()
                .filter(|r| r.parent() == Some(TenantId(raw)))
                .map(|r| r.id().into())
                .collect();
            if !children.is_empty() {
                return Err(StoreError::HasChildren {
                    kind: T::KIND,
                    id: raw,
                    name: current.natural_key().to_string(),
                    children,
                });
            }
        }

        let removed = state.rows.remove(&id).ok_or_else(|| StoreError::NotFound {
            kind: T::KIND,
            key: id.to_string(),
        })?;
        tracing::debug!("Deleted {} {}", T::KIND, id);
        Ok(removed)
    }
}
