use crate::schema::StorageKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Timestamps are stored with UTC semantics; the store keeps the instant, not
/// the zone the value was created in.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Identity of a row inside the store collaborator. Opaque to this layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowId(pub u64);

/// Decimal value with a 128-bit mantissa and a base-10 exponent.
///
/// The pack carries no decimal crate, so the storage representation is a small
/// owned value type: `mantissa * 10^exponent`. Equality is representational,
/// which is exactly what the round-trip contract needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Decimal {
    mantissa: i128,
    exponent: i32,
}

impl Decimal {
    pub const ZERO: Decimal = Decimal { mantissa: 0, exponent: 0 };

    pub fn new(mantissa: i128, exponent: i32) -> Self {
        Decimal { mantissa, exponent }
    }

    pub fn mantissa(&self) -> i128 {
        self.mantissa
    }

    pub fn exponent(&self) -> i32 {
        self.exponent
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Decimal { mantissa: value as i128, exponent: 0 }
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.exponent == 0 {
            write!(f, "{}", self.mantissa)
        } else {
            write!(f, "{}e{}", self.mantissa, self.exponent)
        }
    }
}

/// Tagged union of the primitive representations exchanged with the store.
///
/// One variant per scalar `StorageKind`; `Null` only ever appears as a list
/// element standing in for an absent optional. Collections and backlinks have
/// no scalar representation and never cross this boundary as a `Value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f32),
    Double(f64),
    String(String),
    Blob(Vec<u8>),
    Timestamp(Timestamp),
    Decimal(Decimal),
    Uuid(Uuid),
    Link(RowId),
    Null,
}

impl Value {
    /// The storage kind this value inhabits, `None` for the null sentinel.
    pub fn kind(&self) -> Option<StorageKind> {
        match self {
            Value::Bool(_) => Some(StorageKind::Bool),
            Value::Int(_) => Some(StorageKind::Int),
            Value::Float(_) => Some(StorageKind::Float),
            Value::Double(_) => Some(StorageKind::Double),
            Value::String(_) => Some(StorageKind::String),
            Value::Blob(_) => Some(StorageKind::Blob),
            Value::Timestamp(_) => Some(StorageKind::Timestamp),
            Value::Decimal(_) => Some(StorageKind::Decimal),
            Value::Uuid(_) => Some(StorageKind::Uuid),
            Value::Link(_) => Some(StorageKind::Link),
            Value::Null => None,
        }
    }
}
