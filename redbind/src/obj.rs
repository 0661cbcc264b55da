use crate::error::invariant_violation;
use crate::schema::ObjectSchema;
use crate::store::{ChangeNotifier, ObjectHandle};
use std::sync::Arc;

/// What a field accessor needs from its enclosing object: the class schema,
/// the store binding when managed, and the change-notification pass-through.
pub trait ObjectBase {
    fn object_schema(&self) -> &ObjectSchema;

    /// The store binding, `None` while the object is unmanaged.
    fn handle(&self) -> Option<&ObjectHandle>;

    fn will_change(&self, property: &str);
    fn did_change(&self, property: &str);
}

/// Embeddable object state backing an [`ObjectBase`] implementation.
///
/// Model structs hold one `ObjectCore` next to their `Persisted` fields and
/// delegate the trait to it. The core starts unbound; the attachment
/// collaborator binds the handle, observation consumers bind a notifier.
#[derive(Default)]
pub struct ObjectCore {
    schema: Option<Arc<ObjectSchema>>,
    handle: Option<ObjectHandle>,
    sink: Option<Arc<dyn ChangeNotifier>>,
}

impl ObjectCore {
    pub fn unmanaged(schema: Arc<ObjectSchema>) -> Self {
        ObjectCore { schema: Some(schema), handle: None, sink: None }
    }

    /// Binds the schema without attaching to the store. Needed before
    /// observation starts on an unmanaged object.
    pub fn bind_schema(&mut self, schema: Arc<ObjectSchema>) {
        self.schema = Some(schema);
    }

    /// Binds the store handle; the handle's schema becomes the object's.
    pub fn bind(&mut self, handle: ObjectHandle) {
        self.schema = Some(handle.schema_arc());
        self.handle = Some(handle);
    }

    pub fn subscribe(&mut self, sink: Arc<dyn ChangeNotifier>) {
        self.sink = Some(sink);
    }

    pub fn is_managed(&self) -> bool {
        self.handle.is_some()
    }
}

impl ObjectBase for ObjectCore {
    fn object_schema(&self) -> &ObjectSchema {
        match &self.schema {
            Some(schema) => schema,
            None => invariant_violation("object schema accessed before it was bound"),
        }
    }

    fn handle(&self) -> Option<&ObjectHandle> {
        self.handle.as_ref()
    }

    fn will_change(&self, property: &str) {
        if let Some(sink) = &self.sink {
            sink.will_change(property);
        }
    }

    fn did_change(&self, property: &str) {
        if let Some(sink) = &self.sink {
            sink.did_change(property);
        }
    }
}
