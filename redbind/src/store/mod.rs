//! Store collaborator contracts and the reference engines behind them.
//!
//! The binding layer never implements persistence; it talks to whatever
//! engine stands behind these traits. Thread confinement and transactional
//! isolation are that engine's responsibility: every method here is
//! synchronous call/return, and a violated precondition is the engine's to
//! reject.

pub mod mem;
pub mod redb_store;

use crate::error::BindError;
use crate::schema::ObjectSchema;
use crate::value::{RowId, Value};
use crate::PropertyKey;
use std::sync::{Arc, Weak};

/// One store-backed row, addressed by property key.
///
/// Values cross this boundary as the tagged [`Value`] union, one variant per
/// scalar storage kind.
pub trait StoreRow: Send + Sync {
    fn id(&self) -> RowId;
    fn class_name(&self) -> &str;

    fn get(&self, key: PropertyKey) -> Result<Option<Value>, BindError>;
    fn set(&self, key: PropertyKey, value: Value) -> Result<(), BindError>;
    fn clear(&self, key: PropertyKey) -> Result<(), BindError>;

    /// The live array proxy at `key`; all proxies for one field observe the
    /// same contents.
    fn list(&self, key: PropertyKey) -> Result<Arc<dyn StoreList>, BindError>;

    /// All rows of `class_name` whose field named `origin_property` link to
    /// this row.
    fn backlinks(&self, class_name: &str, origin_property: &str) -> Result<Vec<RowId>, BindError>;
}

/// Live array proxy for one collection field.
pub trait StoreList: Send + Sync {
    /// Stable identity of the underlying field, used to detect assigning a
    /// proxy back to its own field.
    fn proxy_id(&self) -> (RowId, PropertyKey);

    fn len(&self) -> Result<usize, BindError>;
    fn get(&self, index: usize) -> Result<Option<Value>, BindError>;
    fn push(&self, value: Value) -> Result<(), BindError>;
    fn set(&self, index: usize, value: Value) -> Result<(), BindError>;
    fn insert(&self, index: usize, value: Value) -> Result<(), BindError>;
    fn remove(&self, index: usize) -> Result<Value, BindError>;
    fn clear(&self) -> Result<(), BindError>;
    fn values(&self) -> Result<Vec<Value>, BindError>;

    fn append_all(&self, values: Vec<Value>) -> Result<(), BindError> {
        for value in values {
            self.push(value)?;
        }
        Ok(())
    }
}

/// Change-notification hook consumed from the store collaborator.
pub trait ChangeNotifier: Send + Sync {
    fn will_change(&self, property: &str);
    fn did_change(&self, property: &str);
}

/// Weak back-reference from a collection value to its owning object and
/// property. Notification-only; never an ownership relation.
#[derive(Clone)]
pub struct ParentLink {
    notifier: Weak<dyn ChangeNotifier>,
    property: String,
}

impl ParentLink {
    pub fn new(notifier: &Arc<dyn ChangeNotifier>, property: &str) -> Self {
        ParentLink { notifier: Arc::downgrade(notifier), property: property.to_string() }
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    /// Runs `mutate` bracketed by the will/did pair when the owner is still
    /// alive, bare otherwise.
    pub fn notify<R>(&self, mutate: impl FnOnce() -> R) -> R {
        match self.notifier.upgrade() {
            Some(notifier) => {
                notifier.will_change(&self.property);
                let result = mutate();
                notifier.did_change(&self.property);
                result
            }
            None => mutate(),
        }
    }
}

/// Opaque binding of one object to its store row and class schema.
///
/// Owned by the object; fields borrow it only for the duration of a get/set.
#[derive(Clone)]
pub struct ObjectHandle {
    row: Arc<dyn StoreRow>,
    schema: Arc<ObjectSchema>,
}

impl ObjectHandle {
    pub fn new(row: Arc<dyn StoreRow>, schema: Arc<ObjectSchema>) -> Self {
        ObjectHandle { row, schema }
    }

    pub fn row(&self) -> &Arc<dyn StoreRow> {
        &self.row
    }

    pub fn id(&self) -> RowId {
        self.row.id()
    }

    pub fn schema(&self) -> &ObjectSchema {
        &self.schema
    }

    pub fn schema_arc(&self) -> Arc<ObjectSchema> {
        self.schema.clone()
    }
}
