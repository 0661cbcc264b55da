/// Implements [`PropertyType`](crate::PropertyType) for a raw-value backed
/// enum by delegating every operation to the raw value's capability.
///
/// The enum must implement [`RawEnum`](crate::RawEnum). Decoding a stored raw
/// value that maps to no declared case yields `None` through the optional
/// accessor and aborts through the non-optional one. The type keeps the
/// aborting `default_value` stub, so enum fields need an explicit default.
#[macro_export]
macro_rules! impl_enum_property {
    ($t:ty) => {
        impl $crate::PropertyType for $t {
            fn populate(prop: &mut $crate::PropertyDescriptor) -> Result<(), $crate::BindError> {
                <<$t as $crate::RawEnum>::Raw as $crate::PropertyType>::populate(prop)
            }

            fn get(obj: &dyn $crate::ObjectBase, key: $crate::PropertyKey) -> Result<Self, $crate::BindError> {
                let raw = <<$t as $crate::RawEnum>::Raw as $crate::PropertyType>::get(obj, key)?;
                match <$t as $crate::RawEnum>::from_raw(raw) {
                    Some(value) => Ok(value),
                    None => $crate::invariant_violation(concat!(
                        "stored raw value matches no declared case of ",
                        stringify!($t)
                    )),
                }
            }

            fn get_optional(
                obj: &dyn $crate::ObjectBase,
                key: $crate::PropertyKey,
            ) -> Result<Option<Self>, $crate::BindError> {
                let raw = <<$t as $crate::RawEnum>::Raw as $crate::PropertyType>::get_optional(obj, key)?;
                Ok(raw.and_then(<$t as $crate::RawEnum>::from_raw))
            }

            fn set(obj: &dyn $crate::ObjectBase, key: $crate::PropertyKey, value: Self) -> Result<(), $crate::BindError> {
                <<$t as $crate::RawEnum>::Raw as $crate::PropertyType>::set(
                    obj,
                    key,
                    <$t as $crate::RawEnum>::as_raw(&value),
                )
            }

            fn to_value(self) -> $crate::Value {
                $crate::PropertyType::to_value(<$t as $crate::RawEnum>::as_raw(&self))
            }

            fn from_value(value: $crate::Value) -> Option<Self> {
                <<$t as $crate::RawEnum>::Raw as $crate::PropertyType>::from_value(value)
                    .and_then(<$t as $crate::RawEnum>::from_raw)
            }
        }
    };
}
