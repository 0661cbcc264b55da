use crate::capability::{managed_row, PropertyType};
use crate::error::{invariant_violation, BindError};
use crate::obj::ObjectBase;
use crate::schema::{Model, PropertyDescriptor, StorageKind};
use crate::store::StoreRow;
use crate::value::{RowId, Value};
use crate::PropertyKey;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// A forward link to a store-backed instance of model `M`.
///
/// A single link field must be declared optional (`Option<Ref<M>>`); a link
/// list (`List<Ref<M>>`) must not be. Both rules are enforced during schema
/// population.
pub struct Ref<M: Model> {
    id: RowId,
    _marker: PhantomData<fn() -> M>,
}

impl<M: Model> Ref<M> {
    pub fn new(id: RowId) -> Self {
        Ref { id, _marker: PhantomData }
    }

    pub fn id(&self) -> RowId {
        self.id
    }
}

impl<M: Model> Clone for Ref<M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M: Model> Copy for Ref<M> {}

impl<M: Model> PartialEq for Ref<M> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<M: Model> Eq for Ref<M> {}

impl<M: Model> fmt::Debug for Ref<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ref<{}>({})", M::CLASS_NAME, self.id.0)
    }
}

impl<M: Model> PropertyType for Ref<M> {
    fn populate(prop: &mut PropertyDescriptor) -> Result<(), BindError> {
        if !prop.optional && !prop.collection {
            return Err(BindError::schema("", &prop.name, "object link property must be marked as optional"));
        }
        if prop.optional && prop.collection {
            return Err(BindError::schema("", &prop.name, "link list property must not be marked as optional"));
        }
        prop.kind = if prop.collection { StorageKind::LinkList } else { StorageKind::Link };
        prop.linked_class = Some(M::CLASS_NAME);
        Ok(())
    }

    fn get(_obj: &dyn ObjectBase, _key: PropertyKey) -> Result<Self, BindError> {
        invariant_violation("non-optional object link properties are not allowed")
    }

    fn get_optional(obj: &dyn ObjectBase, key: PropertyKey) -> Result<Option<Self>, BindError> {
        match managed_row(obj).get(key)? {
            Some(Value::Link(id)) => Ok(Some(Ref::new(id))),
            Some(_) => invariant_violation(format!("stored value at key {} is not an object link", key)),
            None => Ok(None),
        }
    }

    fn set(obj: &dyn ObjectBase, key: PropertyKey, value: Self) -> Result<(), BindError> {
        managed_row(obj).set(key, Value::Link(value.id))
    }

    fn to_value(self) -> Value {
        Value::Link(self.id)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Link(id) => Some(Ref::new(id)),
            _ => None,
        }
    }
}

struct BacklinkQuery {
    row: Arc<dyn StoreRow>,
}

/// Derived, strictly read-only inverse relationship: all instances of `M`
/// whose field named `origin_property` link to the owning object.
///
/// Unmanaged backlinks resolve to nothing; managed ones run the store's
/// backlink query on every resolve. Setting or defaulting a backlink is a
/// precondition violation.
pub struct Backlinks<M: Model> {
    origin_property: String,
    query: Option<BacklinkQuery>,
    _marker: PhantomData<fn() -> M>,
}

impl<M: Model> Backlinks<M> {
    pub fn new(origin_property: impl Into<String>) -> Self {
        Backlinks { origin_property: origin_property.into(), query: None, _marker: PhantomData }
    }

    pub fn origin_property(&self) -> &str {
        &self.origin_property
    }

    pub fn is_managed(&self) -> bool {
        self.query.is_some()
    }

    /// Evaluates the backlink query against the store.
    pub fn resolve(&self) -> Result<Vec<Ref<M>>, BindError> {
        match &self.query {
            Some(q) => Ok(q
                .row
                .backlinks(M::CLASS_NAME, &self.origin_property)?
                .into_iter()
                .map(Ref::new)
                .collect()),
            None => Ok(Vec::new()),
        }
    }

    pub fn count(&self) -> Result<usize, BindError> {
        Ok(self.resolve()?.len())
    }
}

impl<M: Model> Clone for Backlinks<M> {
    fn clone(&self) -> Self {
        Backlinks {
            origin_property: self.origin_property.clone(),
            query: self.query.as_ref().map(|q| BacklinkQuery { row: q.row.clone() }),
            _marker: PhantomData,
        }
    }
}

impl<M: Model> fmt::Debug for Backlinks<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Backlinks<{}>(origin: {})", M::CLASS_NAME, self.origin_property)
    }
}

impl<M: Model> PropertyType for Backlinks<M> {
    fn populate(prop: &mut PropertyDescriptor) -> Result<(), BindError> {
        prop.kind = StorageKind::Backlink;
        prop.collection = true;
        prop.linked_class = Some(M::CLASS_NAME);
        Ok(())
    }

    fn populate_value(&self, prop: &mut PropertyDescriptor) -> Result<(), BindError> {
        prop.origin_property = Some(self.origin_property.clone());
        Ok(())
    }

    fn get(obj: &dyn ObjectBase, key: PropertyKey) -> Result<Self, BindError> {
        let handle = match obj.handle() {
            Some(handle) => handle,
            None => invariant_violation("managed accessor invoked on an unmanaged object"),
        };
        let prop = handle.schema().property_at(key);
        let origin = match &prop.origin_property {
            Some(origin) => origin.clone(),
            None => invariant_violation(format!("backlink property {} has no origin property", prop.name)),
        };
        Ok(Backlinks {
            origin_property: origin,
            query: Some(BacklinkQuery { row: handle.row().clone() }),
            _marker: PhantomData,
        })
    }

    fn get_optional(_obj: &dyn ObjectBase, _key: PropertyKey) -> Result<Option<Self>, BindError> {
        invariant_violation("backlink properties cannot be optional")
    }

    fn set(_obj: &dyn ObjectBase, _key: PropertyKey, _value: Self) -> Result<(), BindError> {
        invariant_violation("backlink properties are read-only")
    }

    fn default_value() -> Self {
        invariant_violation("backlink properties have no default value")
    }

    fn to_value(self) -> Value {
        invariant_violation("backlinks have no scalar storage representation")
    }

    fn from_value(_value: Value) -> Option<Self> {
        None
    }
}
