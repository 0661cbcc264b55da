//! redbind binds model struct fields to rows in [Redb](https://github.com/cberner/redb)
//! and keeps the field's behavior uniform across the object lifecycle: unmanaged
//! in-memory, observed, and store-backed.
//!
//! Each field is a [`Persisted`] accessor whose value type implements the
//! [`PropertyType`] capability. The capability records the type's storage
//! representation during schema population and carries the managed read/write
//! path; wrappers (`Option`, [`List`], [`Ref`], [`Backlinks`], raw-value enums)
//! compose by delegating to the wrapped type, so no type combination is
//! special-cased anywhere else.

pub mod accessor;
pub mod capability;
pub mod error;
pub mod links;
pub mod list;
pub mod logger;
pub mod macro_rules;
pub mod obj;
pub mod schema;
pub mod store;
pub mod value;

pub use accessor::Persisted;
pub use capability::{IndexableProperty, PrimaryKeyProperty, PropertyType, RawEnum};
pub use error::{invariant_violation, BindError};
pub use links::{Backlinks, Ref};
pub use list::List;
pub use obj::{ObjectBase, ObjectCore};
pub use schema::{register_schema, registered_schema, Model, ObjectSchema, PropertyDescriptor, SchemaBuilder, StorageKind};
pub use store::mem::MemStore;
pub use store::redb_store::RedbStore;
pub use store::{ChangeNotifier, ObjectHandle, ParentLink, StoreList, StoreRow};
pub use value::{Decimal, RowId, Timestamp, Value};

pub use bincode;
pub use chrono;
pub use once_cell;
pub use rand;
pub use redb;
pub use serde;
pub use serde::{Deserialize, Serialize};
pub use uuid;
pub use uuid::Uuid;

/// Index of a property within its class schema; doubles as the store column
/// address for the field.
pub type PropertyKey = u16;
