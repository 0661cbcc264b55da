use crate::capability::{IndexableProperty, PrimaryKeyProperty, PropertyType};
use crate::error::BindError;
use crate::links::Backlinks;
use crate::obj::ObjectBase;
use crate::schema::{Model, PropertyDescriptor, StorageKind};
use crate::store::{ChangeNotifier, ParentLink};
use crate::PropertyKey;
use std::sync::Arc;

/// Per-field runtime state. Transitions are monotonic: an unmanaged state can
/// become observed or managed, a managed state never goes back.
enum PropertyStorage<T> {
    Unmanaged { value: T, indexed: bool, primary: bool },
    UnmanagedNoDefault { indexed: bool, primary: bool },
    UnmanagedObserved { value: T, key: PropertyKey },
    Managed { key: PropertyKey },
    ManagedCached { value: T, key: PropertyKey },
}

/// A managed field on a model object.
///
/// While the owning object is unmanaged the field holds its value in memory;
/// once the store collaborator attaches the object, every read and write is
/// forwarded through the value type's capability to the store row. The field
/// owns its state exclusively and borrows the object's handle only for the
/// duration of a call.
pub struct Persisted<T: PropertyType> {
    storage: PropertyStorage<T>,
}

impl<T: PropertyType> Persisted<T> {
    /// Declares a field without a default value. The capability's
    /// `default_value` is materialized lazily, on first read, at most once.
    pub fn new() -> Self {
        Persisted { storage: PropertyStorage::UnmanagedNoDefault { indexed: false, primary: false } }
    }

    /// Declares a field with an explicit initial value.
    pub fn with_value(value: T) -> Self {
        Persisted { storage: PropertyStorage::Unmanaged { value, indexed: false, primary: false } }
    }

    pub fn is_managed(&self) -> bool {
        matches!(self.storage, PropertyStorage::Managed { .. } | PropertyStorage::ManagedCached { .. })
    }

    pub fn key(&self) -> Option<PropertyKey> {
        match &self.storage {
            PropertyStorage::UnmanagedObserved { key, .. }
            | PropertyStorage::Managed { key }
            | PropertyStorage::ManagedCached { key, .. } => Some(*key),
            _ => None,
        }
    }

    pub fn get(&mut self, obj: &dyn ObjectBase) -> Result<T, BindError> {
        match &self.storage {
            PropertyStorage::Unmanaged { value, .. } => return Ok(value.clone()),
            PropertyStorage::UnmanagedObserved { value, .. } => return Ok(value.clone()),
            PropertyStorage::ManagedCached { value, .. } => return Ok(value.clone()),
            _ => {}
        }
        match self.storage {
            PropertyStorage::UnmanagedNoDefault { indexed, primary } => {
                let value = T::default_value();
                self.storage = PropertyStorage::Unmanaged { value: value.clone(), indexed, primary };
                Ok(value)
            }
            PropertyStorage::Managed { key } => {
                let value = T::get(obj, key)?;
                if T::NEEDS_PARENT {
                    // Collection proxies are stable for the life of the field,
                    // so the first managed read wires one up and keeps it.
                    self.storage = PropertyStorage::ManagedCached { value: value.clone(), key };
                }
                Ok(value)
            }
            _ => unreachable!(),
        }
    }

    pub fn set(&mut self, obj: &dyn ObjectBase, value: T) -> Result<(), BindError> {
        match &self.storage {
            PropertyStorage::UnmanagedObserved { key, .. } => {
                let key = *key;
                let name = obj.object_schema().property_at(key).name.clone();
                obj.will_change(&name);
                self.storage = PropertyStorage::UnmanagedObserved { value, key };
                obj.did_change(&name);
                Ok(())
            }
            PropertyStorage::Managed { key } => T::set(obj, *key, value),
            // The store stays the single source of truth: a write never
            // refreshes the cached value.
            PropertyStorage::ManagedCached { key, .. } => T::set(obj, *key, value),
            PropertyStorage::Unmanaged { indexed, primary, .. } => {
                let (indexed, primary) = (*indexed, *primary);
                self.storage = PropertyStorage::Unmanaged { value, indexed, primary };
                Ok(())
            }
            PropertyStorage::UnmanagedNoDefault { indexed, primary } => {
                let (indexed, primary) = (*indexed, *primary);
                self.storage = PropertyStorage::Unmanaged { value, indexed, primary };
                Ok(())
            }
        }
    }

    /// Starts observation of an unmanaged field: materializes the value if
    /// needed, hands parent-needing values their back-reference, and records
    /// the property key so later writes can name the field in notifications.
    /// Already-observed and managed fields are left alone.
    pub fn observe(&mut self, notifier: &Arc<dyn ChangeNotifier>, prop: &PropertyDescriptor, key: PropertyKey) {
        let value = match &self.storage {
            PropertyStorage::Unmanaged { value, .. } => value.clone(),
            PropertyStorage::UnmanagedNoDefault { .. } => T::default_value(),
            _ => return,
        };
        if T::NEEDS_PARENT {
            value.bind_parent(ParentLink::new(notifier, &prop.name));
        }
        self.storage = PropertyStorage::UnmanagedObserved { value, key };
    }

    /// Moves the field to the managed state. Driven by the attachment
    /// collaborator after it has written the in-memory value to the store.
    pub fn attach(&mut self, key: PropertyKey) {
        self.storage = PropertyStorage::Managed { key };
    }

    /// The attachment collaborator's per-field step: writes the current
    /// in-memory value through the capability (backlinks are derived and have
    /// nothing to write), then attaches.
    pub fn promote(&mut self, obj: &dyn ObjectBase, prop: &PropertyDescriptor, key: PropertyKey) -> Result<(), BindError> {
        if prop.kind != StorageKind::Backlink {
            let value = self.get(obj)?;
            T::set(obj, key, value)?;
        }
        self.attach(key);
        Ok(())
    }

    /// Populates the field's descriptor: the capability's static contribution
    /// first, then the instance flags and instance-level descriptor data from
    /// the unmanaged states.
    pub fn populate(&self, prop: &mut PropertyDescriptor) -> Result<(), BindError> {
        T::populate(prop)?;
        match &self.storage {
            PropertyStorage::Unmanaged { value, indexed, primary } => {
                value.populate_value(prop)?;
                prop.indexed = *indexed || *primary;
                prop.primary_key = *primary;
            }
            PropertyStorage::UnmanagedNoDefault { indexed, primary } => {
                prop.indexed = *indexed || *primary;
                prop.primary_key = *primary;
            }
            _ => {}
        }
        Ok(())
    }
}

impl<T: PropertyType> Default for Persisted<T> {
    fn default() -> Self {
        Persisted::new()
    }
}

impl<T: PropertyType + IndexableProperty> Persisted<T> {
    pub fn indexed() -> Self {
        Persisted { storage: PropertyStorage::UnmanagedNoDefault { indexed: true, primary: false } }
    }

    pub fn with_value_indexed(value: T) -> Self {
        Persisted { storage: PropertyStorage::Unmanaged { value, indexed: true, primary: false } }
    }
}

impl<T: PropertyType + PrimaryKeyProperty> Persisted<T> {
    pub fn primary_key() -> Self {
        Persisted { storage: PropertyStorage::UnmanagedNoDefault { indexed: false, primary: true } }
    }

    pub fn with_value_primary_key(value: T) -> Self {
        Persisted { storage: PropertyStorage::Unmanaged { value, indexed: false, primary: true } }
    }
}

impl<M: Model> Persisted<Backlinks<M>> {
    /// Declares a backlink field deriving its elements from the forward link
    /// field named `origin_property` on `M`.
    pub fn backlink(origin_property: &str) -> Self {
        Persisted::with_value(Backlinks::new(origin_property))
    }
}
