use crate::error::{invariant_violation, BindError};
use crate::schema::{registered_schema, StorageKind};
use crate::store::{StoreList, StoreRow};
use crate::value::{RowId, Value};
use crate::PropertyKey;
use redb::{Database, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;
use std::{env, fs};

const ROWS: TableDefinition<u64, &str> = TableDefinition::new("rows");
const CELLS: TableDefinition<(u64, u16), &[u8]> = TableDefinition::new("cells");
const LISTS: TableDefinition<(u64, u16), &[u8]> = TableDefinition::new("lists");

/// Durable store engine on top of redb.
///
/// Rows live in one table keyed by row id, scalar cells in a second keyed by
/// (row, property key) with bincode-encoded values, list contents in a third
/// as one encoded vector per field. Each operation runs in its own
/// transaction.
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, BindError> {
        let db = Database::create(path)?;
        let write_tx = db.begin_write()?;
        {
            write_tx.open_table(ROWS)?;
            write_tx.open_table(CELLS)?;
            write_tx.open_table(LISTS)?;
        }
        write_tx.commit()?;
        Ok(RedbStore { db: Arc::new(db) })
    }

    /// Opens a throwaway database under the system temp dir with a random
    /// suffix, for tests.
    pub fn temp(name: &str) -> Result<Self, BindError> {
        let dir = env::temp_dir().join("redbind");
        fs::create_dir_all(&dir)?;
        let db_path = dir.join(format!("{}_{}.db", name, rand::random::<u64>()));
        Self::open(db_path)
    }

    pub fn create_row(&self, class: &str) -> Result<Arc<dyn StoreRow>, BindError> {
        let write_tx = self.db.begin_write()?;
        let id = {
            let mut rows = write_tx.open_table(ROWS)?;
            let next = match rows.last()? {
                Some((key, _)) => key.value() + 1,
                None => 1,
            };
            rows.insert(next, class)?;
            RowId(next)
        };
        write_tx.commit()?;
        Ok(Arc::new(RedbRow { db: self.db.clone(), id, class: class.to_string() }))
    }
}

fn encode(value: &Value) -> Result<Vec<u8>, BindError> {
    Ok(bincode::serialize(value)?)
}

fn decode(raw: &[u8]) -> Result<Value, BindError> {
    Ok(bincode::deserialize(raw)?)
}

fn encode_list(values: &[Value]) -> Result<Vec<u8>, BindError> {
    Ok(bincode::serialize(values)?)
}

fn decode_list(raw: &[u8]) -> Result<Vec<Value>, BindError> {
    Ok(bincode::deserialize(raw)?)
}

struct RedbRow {
    db: Arc<Database>,
    id: RowId,
    class: String,
}

impl StoreRow for RedbRow {
    fn id(&self) -> RowId {
        self.id
    }

    fn class_name(&self) -> &str {
        &self.class
    }

    fn get(&self, key: PropertyKey) -> Result<Option<Value>, BindError> {
        let read_tx = self.db.begin_read()?;
        let cells = read_tx.open_table(CELLS)?;
        match cells.get((self.id.0, key))? {
            Some(guard) => Ok(Some(decode(guard.value())?)),
            None => Ok(None),
        }
    }

    fn set(&self, key: PropertyKey, value: Value) -> Result<(), BindError> {
        let encoded = encode(&value)?;
        let write_tx = self.db.begin_write()?;
        {
            let mut cells = write_tx.open_table(CELLS)?;
            cells.insert((self.id.0, key), encoded.as_slice())?;
        }
        write_tx.commit()?;
        Ok(())
    }

    fn clear(&self, key: PropertyKey) -> Result<(), BindError> {
        let write_tx = self.db.begin_write()?;
        {
            let mut cells = write_tx.open_table(CELLS)?;
            cells.remove((self.id.0, key))?;
        }
        write_tx.commit()?;
        Ok(())
    }

    fn list(&self, key: PropertyKey) -> Result<Arc<dyn StoreList>, BindError> {
        Ok(Arc::new(RedbList { db: self.db.clone(), id: self.id, key }))
    }

    fn backlinks(&self, class_name: &str, origin_property: &str) -> Result<Vec<RowId>, BindError> {
        let schema = registered_schema(class_name)
            .ok_or_else(|| BindError::Custom(format!("no schema registered for class {}", class_name)))?;
        let (origin_key, origin) = schema.property_named(origin_property).ok_or_else(|| {
            BindError::Custom(format!("{} has no property named {}", class_name, origin_property))
        })?;

        let read_tx = self.db.begin_read()?;
        let rows = read_tx.open_table(ROWS)?;
        let cells = read_tx.open_table(CELLS)?;
        let lists = read_tx.open_table(LISTS)?;
        let mut out = Vec::new();
        for entry in rows.iter()? {
            let (id_guard, class_guard) = entry?;
            if class_guard.value() != class_name {
                continue;
            }
            let id = id_guard.value();
            let links_back = match origin.kind {
                StorageKind::Link => match cells.get((id, origin_key))? {
                    Some(guard) => decode(guard.value())? == Value::Link(self.id),
                    None => false,
                },
                StorageKind::LinkList => match lists.get((id, origin_key))? {
                    Some(guard) => decode_list(guard.value())?.contains(&Value::Link(self.id)),
                    None => false,
                },
                other => {
                    return Err(BindError::Custom(format!(
                        "{}.{} is not a link property ({:?})",
                        class_name, origin_property, other
                    )))
                }
            };
            if links_back {
                out.push(RowId(id));
            }
        }
        Ok(out)
    }
}

struct RedbList {
    db: Arc<Database>,
    id: RowId,
    key: PropertyKey,
}

impl RedbList {
    fn load(&self) -> Result<Vec<Value>, BindError> {
        let read_tx = self.db.begin_read()?;
        let lists = read_tx.open_table(LISTS)?;
        match lists.get((self.id.0, self.key))? {
            Some(guard) => decode_list(guard.value()),
            None => Ok(Vec::new()),
        }
    }

    fn store(&self, values: &[Value]) -> Result<(), BindError> {
        let encoded = encode_list(values)?;
        let write_tx = self.db.begin_write()?;
        {
            let mut lists = write_tx.open_table(LISTS)?;
            lists.insert((self.id.0, self.key), encoded.as_slice())?;
        }
        write_tx.commit()?;
        Ok(())
    }
}

impl StoreList for RedbList {
    fn proxy_id(&self) -> (RowId, PropertyKey) {
        (self.id, self.key)
    }

    fn len(&self) -> Result<usize, BindError> {
        Ok(self.load()?.len())
    }

    fn get(&self, index: usize) -> Result<Option<Value>, BindError> {
        Ok(self.load()?.into_iter().nth(index))
    }

    fn push(&self, value: Value) -> Result<(), BindError> {
        let mut values = self.load()?;
        values.push(value);
        self.store(&values)
    }

    fn set(&self, index: usize, value: Value) -> Result<(), BindError> {
        let mut values = self.load()?;
        match values.get_mut(index) {
            Some(slot) => *slot = value,
            None => invariant_violation(format!("list index {} out of bounds", index)),
        }
        self.store(&values)
    }

    fn insert(&self, index: usize, value: Value) -> Result<(), BindError> {
        let mut values = self.load()?;
        if index > values.len() {
            invariant_violation(format!("list index {} out of bounds", index));
        }
        values.insert(index, value);
        self.store(&values)
    }

    fn remove(&self, index: usize) -> Result<Value, BindError> {
        let mut values = self.load()?;
        if index >= values.len() {
            invariant_violation(format!("list index {} out of bounds", index));
        }
        let removed = values.remove(index);
        self.store(&values)?;
        Ok(removed)
    }

    fn clear(&self) -> Result<(), BindError> {
        self.store(&[])
    }

    fn values(&self) -> Result<Vec<Value>, BindError> {
        self.load()
    }

    fn append_all(&self, new_values: Vec<Value>) -> Result<(), BindError> {
        let mut values = self.load()?;
        values.extend(new_values);
        self.store(&values)
    }
}
