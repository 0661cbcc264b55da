use crate::error::{invariant_violation, BindError};
use crate::obj::ObjectBase;
use crate::schema::{PropertyDescriptor, StorageKind};
use crate::store::{ParentLink, StoreRow};
use crate::value::{Decimal, Timestamp, Value};
use crate::PropertyKey;
use std::any::type_name;
use std::sync::Arc;
use uuid::Uuid;

/// Marks value types the store can maintain a secondary index for.
pub trait IndexableProperty {}

/// Marks value types usable as a class primary key.
pub trait PrimaryKeyProperty {}

/// Behavioral contract binding a value type to its storage representation.
///
/// Wrapper types (`Option`, raw-value enums, `List`, `Backlinks`) implement
/// this by delegating to the wrapped type's implementation; no combination is
/// special-cased anywhere else.
pub trait PropertyType: Clone + Sized + 'static {
    /// Records this type's storage representation into the descriptor.
    /// Wrappers set their flag first, then delegate inward.
    fn populate(prop: &mut PropertyDescriptor) -> Result<(), BindError>;

    /// Instance-level contribution to the descriptor, consulted only when the
    /// field was declared with a default value. Backlinks record their origin
    /// property here; everything else contributes nothing.
    fn populate_value(&self, _prop: &mut PropertyDescriptor) -> Result<(), BindError> {
        Ok(())
    }

    /// Reads the non-optional value at `key` from the managed row.
    fn get(obj: &dyn ObjectBase, key: PropertyKey) -> Result<Self, BindError>;

    /// Reads the value at `key`, yielding `None` for an absent slot.
    fn get_optional(obj: &dyn ObjectBase, key: PropertyKey) -> Result<Option<Self>, BindError>;

    /// Writes `value` at `key` on the managed row.
    fn set(obj: &dyn ObjectBase, key: PropertyKey, value: Self) -> Result<(), BindError>;

    /// Produces the value a no-default field materializes on first read.
    /// Types without a meaningful default inherit this aborting stub;
    /// invoking it is a programming error in the model declaration.
    fn default_value() -> Self {
        invariant_violation(format!("{} has no default value", type_name::<Self>()))
    }

    /// True for values that need a back-reference to their owning object and
    /// property before attachment (collections).
    const NEEDS_PARENT: bool = false;

    /// Hands a parent-needing value its back-reference when observation of
    /// the owning field starts. No-op for everything else.
    fn bind_parent(&self, _parent: ParentLink) {}

    /// Scalar representation used when this type appears as a list element.
    fn to_value(self) -> Value;

    /// Inverse of `to_value`; `None` signals a representation mismatch.
    fn from_value(value: Value) -> Option<Self>;
}

/// Resolves the store row behind a managed accessor call.
pub(crate) fn managed_row(obj: &dyn ObjectBase) -> &Arc<dyn StoreRow> {
    match obj.handle() {
        Some(handle) => handle.row(),
        None => invariant_violation("managed accessor invoked on an unmanaged object"),
    }
}

fn get_scalar<T: PropertyType>(obj: &dyn ObjectBase, key: PropertyKey) -> Result<T, BindError> {
    match managed_row(obj).get(key)? {
        Some(raw) => match T::from_value(raw) {
            Some(value) => Ok(value),
            None => invariant_violation(format!("stored value at key {} does not match declared type {}", key, type_name::<T>())),
        },
        None => invariant_violation(format!("missing value for non-optional property at key {}", key)),
    }
}

fn get_scalar_optional<T: PropertyType>(obj: &dyn ObjectBase, key: PropertyKey) -> Result<Option<T>, BindError> {
    match managed_row(obj).get(key)? {
        Some(raw) => match T::from_value(raw) {
            Some(value) => Ok(Some(value)),
            None => invariant_violation(format!("stored value at key {} does not match declared type {}", key, type_name::<T>())),
        },
        None => Ok(None),
    }
}

macro_rules! impl_scalar_property {
    ($t:ty, $kind:ident, $default:expr, |$v:ident| $to:expr, |$raw:ident| $from:expr) => {
        impl PropertyType for $t {
            fn populate(prop: &mut PropertyDescriptor) -> Result<(), BindError> {
                prop.kind = StorageKind::$kind;
                Ok(())
            }

            fn get(obj: &dyn ObjectBase, key: PropertyKey) -> Result<Self, BindError> {
                get_scalar::<$t>(obj, key)
            }

            fn get_optional(obj: &dyn ObjectBase, key: PropertyKey) -> Result<Option<Self>, BindError> {
                get_scalar_optional::<$t>(obj, key)
            }

            fn set(obj: &dyn ObjectBase, key: PropertyKey, value: Self) -> Result<(), BindError> {
                managed_row(obj).set(key, value.to_value())
            }

            fn default_value() -> Self {
                $default
            }

            fn to_value(self) -> Value {
                let $v = self;
                $to
            }

            fn from_value(value: Value) -> Option<Self> {
                let $raw = value;
                $from
            }
        }
    };
}

impl_scalar_property!(bool, Bool, false, |v| Value::Bool(v), |raw| match raw {
    Value::Bool(b) => Some(b),
    _ => None,
});

impl_scalar_property!(i64, Int, 0, |v| Value::Int(v), |raw| match raw {
    Value::Int(i) => Some(i),
    _ => None,
});

// Narrow integer widths are stored at the native 64-bit width; read-back must
// reproduce the exact bit pattern for every representable value, so an
// out-of-width stored value is a schema mismatch, not a truncation.
macro_rules! impl_narrow_int_property {
    ($($t:ty),*) => {
        $(
            impl_scalar_property!($t, Int, 0, |v| Value::Int(i64::from(v)), |raw| match raw {
                Value::Int(i) => <$t>::try_from(i).ok(),
                _ => None,
            });
        )*
    };
}

impl_narrow_int_property!(i8, i16, i32);

impl_scalar_property!(f32, Float, 0.0, |v| Value::Float(v), |raw| match raw {
    Value::Float(f) => Some(f),
    _ => None,
});

impl_scalar_property!(f64, Double, 0.0, |v| Value::Double(v), |raw| match raw {
    Value::Double(d) => Some(d),
    _ => None,
});

impl_scalar_property!(String, String, String::new(), |v| Value::String(v), |raw| match raw {
    Value::String(s) => Some(s),
    _ => None,
});

impl_scalar_property!(Vec<u8>, Blob, Vec::new(), |v| Value::Blob(v), |raw| match raw {
    Value::Blob(b) => Some(b),
    _ => None,
});

impl_scalar_property!(Timestamp, Timestamp, chrono::Utc::now(), |v| Value::Timestamp(v), |raw| match raw {
    Value::Timestamp(t) => Some(t),
    _ => None,
});

impl_scalar_property!(Decimal, Decimal, Decimal::ZERO, |v| Value::Decimal(v), |raw| match raw {
    Value::Decimal(d) => Some(d),
    _ => None,
});

impl_scalar_property!(Uuid, Uuid, Uuid::nil(), |v| Value::Uuid(v), |raw| match raw {
    Value::Uuid(u) => Some(u),
    _ => None,
});

impl IndexableProperty for bool {}
impl IndexableProperty for i8 {}
impl IndexableProperty for i16 {}
impl IndexableProperty for i32 {}
impl IndexableProperty for i64 {}
impl IndexableProperty for String {}
impl IndexableProperty for Timestamp {}
impl IndexableProperty for Uuid {}

impl PrimaryKeyProperty for bool {}
impl PrimaryKeyProperty for i8 {}
impl PrimaryKeyProperty for i16 {}
impl PrimaryKeyProperty for i32 {}
impl PrimaryKeyProperty for i64 {}
impl PrimaryKeyProperty for String {}
impl PrimaryKeyProperty for Uuid {}

impl<T: PropertyType> PropertyType for Option<T> {
    fn populate(prop: &mut PropertyDescriptor) -> Result<(), BindError> {
        if prop.optional {
            return Err(BindError::schema("", &prop.name, "double-optional properties are not supported"));
        }
        prop.optional = true;
        T::populate(prop)
    }

    fn get(obj: &dyn ObjectBase, key: PropertyKey) -> Result<Self, BindError> {
        T::get_optional(obj, key)
    }

    fn get_optional(_obj: &dyn ObjectBase, _key: PropertyKey) -> Result<Option<Self>, BindError> {
        invariant_violation("double-optional accessors are not supported")
    }

    fn set(obj: &dyn ObjectBase, key: PropertyKey, value: Self) -> Result<(), BindError> {
        match value {
            Some(inner) => T::set(obj, key, inner),
            None => managed_row(obj).clear(key),
        }
    }

    fn default_value() -> Self {
        None
    }

    fn to_value(self) -> Value {
        match self {
            Some(inner) => inner.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: IndexableProperty> IndexableProperty for Option<T> {}
impl<T: PrimaryKeyProperty> PrimaryKeyProperty for Option<T> {}

/// Contract for enumerations persisted through their raw value.
///
/// `from_raw` returns `None` for a stored raw value that maps to no declared
/// case; the optional accessor treats that as absent, the non-optional one
/// aborts. Wire a type up with [`impl_enum_property!`](crate::impl_enum_property).
pub trait RawEnum: Clone + 'static {
    type Raw: PropertyType;

    fn from_raw(raw: Self::Raw) -> Option<Self>;
    fn as_raw(&self) -> Self::Raw;
}
