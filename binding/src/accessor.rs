//! Property accessors.
//!
//! Every managed field is an accessor. Before an object is added to a
//! database the value lives in the field itself; once bound, the field holds
//! a [`Slot`] and every read and write goes to the storage engine.

use crate::{
    error::Result, ManagedValue, Managed, ObjectKey, Reflect, Storage, TypeShape,
};
use std::fmt;
use std::sync::Arc;

/// Location of one property of one stored object.
#[derive(Clone)]
pub struct Slot {
    storage: Arc<dyn Storage>,
    object: ObjectKey,
    column: Arc<str>,
}

impl Slot {
    pub fn new(storage: Arc<dyn Storage>, object: ObjectKey, column: &str) -> Self {
        Self {
            storage,
            object,
            column: Arc::from(column),
        }
    }

    pub fn object(&self) -> ObjectKey {
        self.object
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn read(&self) -> Result<ManagedValue> {
        self.storage.read(self.object, &self.column)
    }

    pub fn write(&self, value: ManagedValue) -> Result<()> {
        self.storage.write(self.object, &self.column, value)
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("object", &self.object)
            .field("column", &self.column)
            .finish()
    }
}

/// Uniform access to a managed field.
pub trait Accessor {
    /// Current value, from the field or from storage.
    fn read(&self) -> Result<ManagedValue>;

    /// Replace the value. Fails if `value` does not convert to the field type.
    fn write(&mut self, value: ManagedValue) -> Result<()>;

    /// Switch the field to managed mode. Any unmanaged value is discarded;
    /// callers read it first.
    fn bind(&mut self, slot: Slot);

    fn slot(&self) -> Option<&Slot>;

    fn is_managed(&self) -> bool {
        self.slot().is_some()
    }
}

#[derive(Clone)]
pub(crate) enum State<T> {
    Unmanaged(T),
    Managed(Slot),
}

impl<T: fmt::Debug> fmt::Debug for State<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Unmanaged(value) => fmt::Debug::fmt(value, f),
            State::Managed(slot) => fmt::Debug::fmt(slot, f),
        }
    }
}

impl<T> State<T> {
    pub(crate) fn slot(&self) -> Option<&Slot> {
        match self {
            State::Managed(slot) => Some(slot),
            State::Unmanaged(_) => None,
        }
    }
}

/// A scalar, optional or link property.
#[derive(Clone)]
pub struct Persisted<T> {
    state: State<T>,
}

impl<T: Managed> Persisted<T> {
    pub fn new(value: T) -> Self {
        Self {
            state: State::Unmanaged(value),
        }
    }

    pub fn get(&self) -> Result<T> {
        match &self.state {
            State::Unmanaged(value) => Ok(value.clone()),
            State::Managed(slot) => T::from_value(slot.read()?),
        }
    }

    pub fn set(&mut self, value: T) -> Result<()> {
        match &mut self.state {
            State::Unmanaged(current) => {
                *current = value;
                Ok(())
            }
            State::Managed(slot) => slot.write(value.to_value()),
        }
    }
}

impl<T: Managed + Default> Default for Persisted<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Managed> From<T> for Persisted<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for Persisted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Persisted").field(&self.state).finish()
    }
}

impl<T: Managed> Reflect for Persisted<T> {
    fn shape() -> TypeShape {
        T::shape()
    }
}

impl<T: Managed> Accessor for Persisted<T> {
    fn read(&self) -> Result<ManagedValue> {
        match &self.state {
            State::Unmanaged(value) => Ok(value.to_value()),
            State::Managed(slot) => slot.read(),
        }
    }

    fn write(&mut self, value: ManagedValue) -> Result<()> {
        match &mut self.state {
            State::Unmanaged(current) => {
                *current = T::from_value(value)?;
                Ok(())
            }
            State::Managed(slot) => {
                // Convert first so storage never holds a value of the wrong type
                let value = T::from_value(value)?.to_value();
                slot.write(value)
            }
        }
    }

    fn bind(&mut self, slot: Slot) {
        self.state = State::Managed(slot);
    }

    fn slot(&self) -> Option<&Slot> {
        self.state.slot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, MemoryStore, PropertyType};
    use std::collections::BTreeMap;

    fn managed_slot(column: &str, value: ManagedValue) -> Slot {
        let store: Arc<dyn Storage> = Arc::new(MemoryStore::new());
        let mut values = BTreeMap::new();
        values.insert(column.to_string(), value);
        let key = store.create("Dog", None, values).unwrap();
        Slot::new(store, key, column)
    }

    #[test]
    fn unmanaged_values_live_in_the_field() {
        let mut age = Persisted::new(3i64);
        assert!(!age.is_managed());
        assert_eq!(age.get().unwrap(), 3);
        age.set(4).unwrap();
        assert_eq!(age.read().unwrap(), ManagedValue::Int(4));
    }

    #[test]
    fn managed_values_go_to_storage() {
        let slot = managed_slot("age", ManagedValue::Int(3));
        let storage = Arc::clone(slot.storage());
        let key = slot.object();

        let mut age: Persisted<i64> = Persisted::default();
        age.bind(slot);
        assert!(age.is_managed());
        assert_eq!(age.get().unwrap(), 3);

        age.set(10).unwrap();
        assert_eq!(storage.read(key, "age").unwrap(), ManagedValue::Int(10));
    }

    #[test]
    fn clones_of_managed_fields_share_storage() {
        let mut name: Persisted<String> = Persisted::default();
        name.bind(managed_slot("name", ManagedValue::from("Rex")));
        let mut other = name.clone();
        other.set("Max".to_string()).unwrap();
        assert_eq!(name.get().unwrap(), "Max");
    }

    #[test]
    fn write_rejects_wrong_type() {
        let mut flag = Persisted::new(false);
        assert!(matches!(
            flag.write(ManagedValue::Int(1)),
            Err(Error::ValueConversion { .. })
        ));

        let mut age: Persisted<i64> = Persisted::default();
        age.bind(managed_slot("age", ManagedValue::Int(1)));
        assert!(age.write(ManagedValue::from("one")).is_err());
        assert_eq!(age.get().unwrap(), 1);
    }

    #[test]
    fn shape_is_the_inner_type() {
        assert_eq!(
            <Persisted<Option<bool>> as Reflect>::shape(),
            TypeShape::optional(TypeShape::Scalar(PropertyType::Bool))
        );
    }
}
