use crate::accessor::Persisted;
use crate::capability::PropertyType;
use crate::error::{invariant_violation, BindError};
use crate::PropertyKey;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Closed set of primitive representations the underlying store understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StorageKind {
    Bool,
    Int,
    Float,
    Double,
    String,
    Blob,
    Timestamp,
    Decimal,
    Uuid,
    Link,
    LinkList,
    Backlink,
}

/// Immutable per-field schema record produced by population.
///
/// Flags are fixed once the class schema is built and are never recomputed
/// from instance-level writes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyDescriptor {
    pub name: String,
    pub kind: StorageKind,
    pub optional: bool,
    pub collection: bool,
    pub indexed: bool,
    pub primary_key: bool,
    pub linked_class: Option<&'static str>,
    pub origin_property: Option<String>,
}

impl PropertyDescriptor {
    pub(crate) fn named(name: &str) -> Self {
        PropertyDescriptor {
            name: name.to_string(),
            kind: StorageKind::Int,
            optional: false,
            collection: false,
            indexed: false,
            primary_key: false,
            linked_class: None,
            origin_property: None,
        }
    }
}

/// A model class declares its managed fields through this trait.
///
/// `declare_properties` must visit fields in source order; a model embedding a
/// base model's fields declares those first, which fixes the inherited-first
/// ordering of the resulting descriptor list.
pub trait Model: Default + 'static {
    const CLASS_NAME: &'static str;

    fn declare_properties(&self, builder: &mut SchemaBuilder) -> Result<(), BindError>;
}

/// Collects descriptors for one class during schema population.
pub struct SchemaBuilder {
    class_name: &'static str,
    properties: Vec<PropertyDescriptor>,
}

impl SchemaBuilder {
    fn new(class_name: &'static str) -> Self {
        SchemaBuilder { class_name, properties: Vec::new() }
    }

    /// Populates and appends the descriptor for one declared field.
    ///
    /// Any capability-level rejection (invalid optional/collection nesting,
    /// link optionality) surfaces here with the field and class named.
    pub fn property<T: PropertyType>(&mut self, name: &str, field: &Persisted<T>) -> Result<(), BindError> {
        let mut prop = PropertyDescriptor::named(name);
        field.populate(&mut prop).map_err(|e| e.with_class(self.class_name))?;
        self.validate(&prop)?;
        self.properties.push(prop);
        Ok(())
    }

    fn validate(&self, prop: &PropertyDescriptor) -> Result<(), BindError> {
        if prop.kind == StorageKind::Backlink && prop.origin_property.is_none() {
            return Err(BindError::schema(self.class_name, &prop.name, "backlink property must declare an origin property"));
        }
        Ok(())
    }

    fn finish(self) -> ObjectSchema {
        ObjectSchema { class_name: self.class_name, properties: self.properties }
    }
}

/// Ordered, immutable descriptor list for one model class.
#[derive(Debug, Clone, Serialize)]
pub struct ObjectSchema {
    class_name: &'static str,
    properties: Vec<PropertyDescriptor>,
}

impl ObjectSchema {
    /// Walks the model's declared fields in source order and builds the
    /// class schema. Fatal on the first invalid declaration.
    pub fn populate<M: Model>() -> Result<ObjectSchema, BindError> {
        Self::populate_from(&M::default())
    }

    /// Builds the schema from a specific instance, so per-field declaration
    /// flags and instance-level descriptor data (backlink origins) come from
    /// that instance's fields.
    pub fn populate_from<M: Model>(model: &M) -> Result<ObjectSchema, BindError> {
        let mut builder = SchemaBuilder::new(M::CLASS_NAME);
        model.declare_properties(&mut builder)?;
        let schema = builder.finish();
        crate::info!("Populated schema for {} with {} properties", schema.class_name, schema.properties.len());
        Ok(schema)
    }

    pub fn class_name(&self) -> &'static str {
        self.class_name
    }

    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    pub fn property_at(&self, key: PropertyKey) -> &PropertyDescriptor {
        match self.properties.get(key as usize) {
            Some(prop) => prop,
            None => invariant_violation(format!("{} has no property at key {}", self.class_name, key)),
        }
    }

    pub fn property_named(&self, name: &str) -> Option<(PropertyKey, &PropertyDescriptor)> {
        self.properties.iter().position(|p| p.name == name).map(|i| (i as PropertyKey, &self.properties[i]))
    }
}

static SCHEMAS: Lazy<RwLock<HashMap<&'static str, Arc<ObjectSchema>>>> = Lazy::new(|| RwLock::new(HashMap::new()));

/// Populates and registers the schema for `M`, once per process.
///
/// Repeated calls return the already-registered schema; registered schemas are
/// never mutated or replaced.
pub fn register_schema<M: Model>() -> Result<Arc<ObjectSchema>, BindError> {
    if let Some(schema) = SCHEMAS.read()?.get(M::CLASS_NAME) {
        return Ok(schema.clone());
    }
    let schema = Arc::new(ObjectSchema::populate::<M>()?);
    let mut map = SCHEMAS.write()?;
    Ok(map.entry(M::CLASS_NAME).or_insert(schema).clone())
}

/// Looks up a previously registered schema by class name.
pub fn registered_schema(class_name: &str) -> Option<Arc<ObjectSchema>> {
    SCHEMAS.read().ok()?.get(class_name).cloned()
}
