use crate::error::{invariant_violation, BindError};
use crate::schema::{registered_schema, StorageKind};
use crate::store::{StoreList, StoreRow};
use crate::value::{RowId, Value};
use crate::PropertyKey;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

struct MemRowData {
    class: &'static str,
    cells: HashMap<PropertyKey, Value>,
}

struct MemInner {
    rows: Mutex<HashMap<RowId, MemRowData>>,
    lists: Mutex<HashMap<(RowId, PropertyKey), Vec<Value>>>,
    next_id: AtomicU64,
    list_ops: AtomicUsize,
}

/// In-memory store engine. Rows and list contents live in shared maps, so
/// every proxy handed out for the same field observes the same live state.
#[derive(Clone)]
pub struct MemStore {
    inner: Arc<MemInner>,
}

impl MemStore {
    pub fn new() -> Self {
        MemStore {
            inner: Arc::new(MemInner {
                rows: Mutex::new(HashMap::new()),
                lists: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                list_ops: AtomicUsize::new(0),
            }),
        }
    }

    pub fn create_row(&self, class: &'static str) -> Result<Arc<dyn StoreRow>, BindError> {
        let id = RowId(self.inner.next_id.fetch_add(1, Ordering::SeqCst));
        self.inner.rows.lock()?.insert(id, MemRowData { class, cells: HashMap::new() });
        Ok(Arc::new(MemRow { inner: self.inner.clone(), id, class }))
    }

    /// Running count of list mutations, across all rows.
    pub fn list_op_count(&self) -> usize {
        self.inner.list_ops.load(Ordering::SeqCst)
    }
}

impl Default for MemStore {
    fn default() -> Self {
        MemStore::new()
    }
}

struct MemRow {
    inner: Arc<MemInner>,
    id: RowId,
    class: &'static str,
}

impl StoreRow for MemRow {
    fn id(&self) -> RowId {
        self.id
    }

    fn class_name(&self) -> &str {
        self.class
    }

    fn get(&self, key: PropertyKey) -> Result<Option<Value>, BindError> {
        let rows = self.inner.rows.lock()?;
        match rows.get(&self.id) {
            Some(row) => Ok(row.cells.get(&key).cloned()),
            None => Err(BindError::Custom(format!("row {} was deleted", self.id.0))),
        }
    }

    fn set(&self, key: PropertyKey, value: Value) -> Result<(), BindError> {
        let mut rows = self.inner.rows.lock()?;
        match rows.get_mut(&self.id) {
            Some(row) => {
                row.cells.insert(key, value);
                Ok(())
            }
            None => Err(BindError::Custom(format!("row {} was deleted", self.id.0))),
        }
    }

    fn clear(&self, key: PropertyKey) -> Result<(), BindError> {
        let mut rows = self.inner.rows.lock()?;
        match rows.get_mut(&self.id) {
            Some(row) => {
                row.cells.remove(&key);
                Ok(())
            }
            None => Err(BindError::Custom(format!("row {} was deleted", self.id.0))),
        }
    }

    fn list(&self, key: PropertyKey) -> Result<Arc<dyn StoreList>, BindError> {
        self.inner.lists.lock()?.entry((self.id, key)).or_default();
        Ok(Arc::new(MemList { inner: self.inner.clone(), id: self.id, key }))
    }

    fn backlinks(&self, class_name: &str, origin_property: &str) -> Result<Vec<RowId>, BindError> {
        let schema = registered_schema(class_name)
            .ok_or_else(|| BindError::Custom(format!("no schema registered for class {}", class_name)))?;
        let (origin_key, origin) = schema.property_named(origin_property).ok_or_else(|| {
            BindError::Custom(format!("{} has no property named {}", class_name, origin_property))
        })?;

        let rows = self.inner.rows.lock()?;
        let mut out = Vec::new();
        match origin.kind {
            StorageKind::Link => {
                for (id, row) in rows.iter() {
                    if row.class == class_name && row.cells.get(&origin_key) == Some(&Value::Link(self.id)) {
                        out.push(*id);
                    }
                }
            }
            StorageKind::LinkList => {
                let lists = self.inner.lists.lock()?;
                for (id, row) in rows.iter() {
                    if row.class != class_name {
                        continue;
                    }
                    if let Some(elems) = lists.get(&(*id, origin_key)) {
                        if elems.contains(&Value::Link(self.id)) {
                            out.push(*id);
                        }
                    }
                }
            }
            other => {
                return Err(BindError::Custom(format!(
                    "{}.{} is not a link property ({:?})",
                    class_name, origin_property, other
                )))
            }
        }
        out.sort();
        Ok(out)
    }
}

struct MemList {
    inner: Arc<MemInner>,
    id: RowId,
    key: PropertyKey,
}

impl MemList {
    fn with_elems<R>(&self, f: impl FnOnce(&mut Vec<Value>) -> R) -> Result<R, BindError> {
        let mut lists = self.inner.lists.lock()?;
        Ok(f(lists.entry((self.id, self.key)).or_default()))
    }

    fn record_op(&self) {
        self.inner.list_ops.fetch_add(1, Ordering::SeqCst);
    }
}

impl StoreList for MemList {
    fn proxy_id(&self) -> (RowId, PropertyKey) {
        (self.id, self.key)
    }

    fn len(&self) -> Result<usize, BindError> {
        self.with_elems(|elems| elems.len())
    }

    fn get(&self, index: usize) -> Result<Option<Value>, BindError> {
        self.with_elems(|elems| elems.get(index).cloned())
    }

    fn push(&self, value: Value) -> Result<(), BindError> {
        self.record_op();
        self.with_elems(|elems| elems.push(value))
    }

    fn set(&self, index: usize, value: Value) -> Result<(), BindError> {
        self.record_op();
        self.with_elems(|elems| match elems.get_mut(index) {
            Some(slot) => *slot = value,
            None => invariant_violation(format!("list index {} out of bounds", index)),
        })
    }

    fn insert(&self, index: usize, value: Value) -> Result<(), BindError> {
        self.record_op();
        self.with_elems(|elems| {
            if index > elems.len() {
                invariant_violation(format!("list index {} out of bounds", index));
            }
            elems.insert(index, value)
        })
    }

    fn remove(&self, index: usize) -> Result<Value, BindError> {
        self.record_op();
        self.with_elems(|elems| {
            if index >= elems.len() {
                invariant_violation(format!("list index {} out of bounds", index));
            }
            elems.remove(index)
        })
    }

    fn clear(&self) -> Result<(), BindError> {
        self.record_op();
        self.with_elems(|elems| elems.clear())
    }

    fn values(&self) -> Result<Vec<Value>, BindError> {
        self.with_elems(|elems| elems.clone())
    }
}
