//! Model types.

use crate::{Accessor, FieldInfo, ObjectKey, Slot};

/// A type whose instances can be stored in a [`Database`](crate::Database).
///
/// Usually implemented with `#[derive(Object)]`. A hand-written impl must
/// list every declared field in [`reflect`](ObjectType::reflect), in
/// declaration order, and expose an accessor for every managed field.
///
/// ```rust
/// use tessel::{Object, Persisted, List, schema_of};
///
/// #[derive(Default, Object)]
/// #[tessel(class = "Dog")]
/// struct Dog {
///     #[tessel(primary_key)]
///     id: Persisted<i64>,
///     name: Persisted<String>,
///     tricks: List<String>,
/// }
///
/// let schema = schema_of::<Dog>();
/// assert_eq!(schema.primary_key.as_deref(), Some("id"));
/// assert_eq!(schema.properties.len(), 3);
/// ```
pub trait ObjectType: Default + 'static {
    const CLASS_NAME: &'static str;

    /// Embedded objects are owned by a parent and have no independent
    /// lifetime.
    const EMBEDDED: bool = false;

    fn primary_key() -> Option<&'static str> {
        None
    }

    fn ignored_properties() -> &'static [&'static str] {
        &[]
    }

    fn indexed_properties() -> &'static [&'static str] {
        &[]
    }

    /// `(property, column)` pairs for properties persisted under another name.
    fn column_names() -> &'static [(&'static str, &'static str)] {
        &[]
    }

    /// Declared fields in declaration order.
    fn reflect(&self) -> Vec<FieldInfo>;

    fn accessors(&self) -> Vec<(&'static str, &dyn Accessor)>;

    fn accessors_mut(&mut self) -> Vec<(&'static str, &mut dyn Accessor)>;

    /// Storage location of the first bound field once the object has been
    /// added. Every schema has at least one property, so a stored object
    /// always has one.
    fn object_slot(&self) -> Option<&Slot> {
        self.accessors()
            .into_iter()
            .find_map(|(_, accessor)| accessor.slot())
    }

    /// Storage key once the object has been added.
    fn object_key(&self) -> Option<ObjectKey> {
        self.object_slot().map(Slot::object)
    }

    fn is_managed(&self) -> bool {
        self.object_key().is_some()
    }
}
