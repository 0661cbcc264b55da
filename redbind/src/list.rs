use crate::capability::{managed_row, PropertyType};
use crate::error::{invariant_violation, BindError};
use crate::obj::ObjectBase;
use crate::schema::PropertyDescriptor;
use crate::store::{ParentLink, StoreList};
use crate::value::Value;
use crate::PropertyKey;
use std::fmt;
use std::sync::{Arc, Mutex};

enum ListInner<T> {
    Unmanaged { elems: Vec<T>, parent: Option<ParentLink> },
    Managed { proxy: Arc<dyn StoreList> },
}

/// Ordered, possibly-empty sequence of capability-registered elements.
///
/// A `List` value is a handle, not an owned buffer: clones share the same
/// underlying state, so every handle onto a field observes the same live
/// contents whether the field is unmanaged (shared in-memory sequence) or
/// managed (the store's live array proxy).
pub struct List<T: PropertyType> {
    inner: Arc<Mutex<ListInner<T>>>,
}

impl<T: PropertyType> List<T> {
    pub fn new() -> Self {
        List::unmanaged(Vec::new())
    }

    fn unmanaged(elems: Vec<T>) -> Self {
        List { inner: Arc::new(Mutex::new(ListInner::Unmanaged { elems, parent: None })) }
    }

    fn managed(proxy: Arc<dyn StoreList>) -> Self {
        List { inner: Arc::new(Mutex::new(ListInner::Managed { proxy })) }
    }

    pub fn is_managed(&self) -> bool {
        match self.inner.lock() {
            Ok(inner) => matches!(&*inner, ListInner::Managed { .. }),
            Err(_) => false,
        }
    }

    /// Identity of the backing store proxy, `None` while unmanaged.
    pub fn proxy_identity(&self) -> Option<(crate::RowId, PropertyKey)> {
        match &*self.inner.lock().ok()? {
            ListInner::Managed { proxy } => Some(proxy.proxy_id()),
            ListInner::Unmanaged { .. } => None,
        }
    }

    pub fn len(&self) -> Result<usize, BindError> {
        match &*self.inner.lock()? {
            ListInner::Unmanaged { elems, .. } => Ok(elems.len()),
            ListInner::Managed { proxy } => proxy.len(),
        }
    }

    pub fn is_empty(&self) -> Result<bool, BindError> {
        Ok(self.len()? == 0)
    }

    pub fn get(&self, index: usize) -> Result<Option<T>, BindError> {
        match &*self.inner.lock()? {
            ListInner::Unmanaged { elems, .. } => Ok(elems.get(index).cloned()),
            ListInner::Managed { proxy } => Ok(proxy.get(index)?.map(decode::<T>)),
        }
    }

    pub fn push(&self, value: T) -> Result<(), BindError> {
        match &mut *self.inner.lock()? {
            ListInner::Unmanaged { elems, parent } => {
                match parent {
                    Some(p) => p.notify(|| elems.push(value)),
                    None => elems.push(value),
                }
                Ok(())
            }
            ListInner::Managed { proxy } => proxy.push(value.to_value()),
        }
    }

    pub fn insert(&self, index: usize, value: T) -> Result<(), BindError> {
        match &mut *self.inner.lock()? {
            ListInner::Unmanaged { elems, parent } => {
                if index > elems.len() {
                    invariant_violation(format!("list index {} out of bounds", index));
                }
                match parent {
                    Some(p) => p.notify(|| elems.insert(index, value)),
                    None => elems.insert(index, value),
                }
                Ok(())
            }
            ListInner::Managed { proxy } => proxy.insert(index, value.to_value()),
        }
    }

    pub fn set(&self, index: usize, value: T) -> Result<(), BindError> {
        match &mut *self.inner.lock()? {
            ListInner::Unmanaged { elems, parent } => {
                if index >= elems.len() {
                    invariant_violation(format!("list index {} out of bounds", index));
                }
                match parent {
                    Some(p) => p.notify(|| elems[index] = value),
                    None => elems[index] = value,
                }
                Ok(())
            }
            ListInner::Managed { proxy } => proxy.set(index, value.to_value()),
        }
    }

    pub fn remove(&self, index: usize) -> Result<T, BindError> {
        match &mut *self.inner.lock()? {
            ListInner::Unmanaged { elems, parent } => {
                if index >= elems.len() {
                    invariant_violation(format!("list index {} out of bounds", index));
                }
                Ok(match parent {
                    Some(p) => p.notify(|| elems.remove(index)),
                    None => elems.remove(index),
                })
            }
            ListInner::Managed { proxy } => Ok(decode::<T>(proxy.remove(index)?)),
        }
    }

    pub fn clear(&self) -> Result<(), BindError> {
        match &mut *self.inner.lock()? {
            ListInner::Unmanaged { elems, parent } => {
                match parent {
                    Some(p) => p.notify(|| elems.clear()),
                    None => elems.clear(),
                }
                Ok(())
            }
            ListInner::Managed { proxy } => proxy.clear(),
        }
    }

    /// Snapshot of the current elements in order.
    pub fn to_vec(&self) -> Result<Vec<T>, BindError> {
        match &*self.inner.lock()? {
            ListInner::Unmanaged { elems, .. } => Ok(elems.clone()),
            ListInner::Managed { proxy } => Ok(proxy.values()?.into_iter().map(decode::<T>).collect()),
        }
    }

    fn raw_values(&self) -> Result<Vec<Value>, BindError> {
        match &*self.inner.lock()? {
            ListInner::Unmanaged { elems, .. } => Ok(elems.iter().cloned().map(PropertyType::to_value).collect()),
            ListInner::Managed { proxy } => proxy.values(),
        }
    }
}

fn decode<T: PropertyType>(raw: Value) -> T {
    match T::from_value(raw) {
        Some(value) => value,
        None => invariant_violation(format!(
            "stored list element does not match declared element type {}",
            std::any::type_name::<T>()
        )),
    }
}

impl<T: PropertyType> Default for List<T> {
    fn default() -> Self {
        List::new()
    }
}

impl<T: PropertyType> Clone for List<T> {
    fn clone(&self) -> Self {
        List { inner: Arc::clone(&self.inner) }
    }
}

impl<T: PropertyType + fmt::Debug> fmt::Debug for List<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.lock() {
            Ok(inner) => match &*inner {
                ListInner::Unmanaged { elems, .. } => f.debug_tuple("List").field(elems).finish(),
                ListInner::Managed { proxy } => f.debug_tuple("List").field(&proxy.proxy_id()).finish(),
            },
            Err(_) => f.write_str("List(<poisoned>)"),
        }
    }
}

impl<T: PropertyType> FromIterator<T> for List<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        List::unmanaged(iter.into_iter().collect())
    }
}

impl<T: PropertyType> PropertyType for List<T> {
    fn populate(prop: &mut PropertyDescriptor) -> Result<(), BindError> {
        if prop.collection {
            return Err(BindError::schema("", &prop.name, "nested collection properties are not supported"));
        }
        if prop.optional {
            return Err(BindError::schema("", &prop.name, "collection properties must not be marked as optional"));
        }
        prop.collection = true;
        T::populate(prop)
    }

    fn get(obj: &dyn ObjectBase, key: PropertyKey) -> Result<Self, BindError> {
        Ok(List::managed(managed_row(obj).list(key)?))
    }

    fn get_optional(obj: &dyn ObjectBase, key: PropertyKey) -> Result<Option<Self>, BindError> {
        Ok(Some(<Self as PropertyType>::get(obj, key)?))
    }

    /// Replace-contents semantics: the field's proxy keeps its identity so
    /// listeners bound to it keep observing the same live view. Assigning the
    /// field's own live proxy back to itself is a no-op.
    fn set(obj: &dyn ObjectBase, key: PropertyKey, value: Self) -> Result<(), BindError> {
        let proxy = managed_row(obj).list(key)?;
        if let Some(identity) = value.proxy_identity() {
            if identity == proxy.proxy_id() {
                return Ok(());
            }
        }
        let values = value.raw_values()?;
        proxy.clear()?;
        proxy.append_all(values)
    }

    fn default_value() -> Self {
        List::new()
    }

    const NEEDS_PARENT: bool = true;

    fn bind_parent(&self, parent: ParentLink) {
        if let Ok(mut inner) = self.inner.lock() {
            if let ListInner::Unmanaged { parent: slot, .. } = &mut *inner {
                *slot = Some(parent);
            }
        }
    }

    fn to_value(self) -> Value {
        invariant_violation("collections have no scalar storage representation")
    }

    fn from_value(_value: Value) -> Option<Self> {
        None
    }
}
