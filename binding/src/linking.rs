//! Backlink properties.
//!
//! A [`LinkingObjects`] field lists the objects of another class whose
//! origin property links to the owning object. It has no stored column and
//! cannot be written.

use crate::{
    accessor::{Accessor, Slot},
    error::Result,
    Error, Link, ManagedValue, ObjectKey, ObjectType,
};
use std::fmt;
use std::marker::PhantomData;

/// Field types that follow links back to their origin class.
pub trait LinkOrigin {
    fn origin_class() -> &'static str;
}

/// Objects of `T` linking to the owner through the property named in
/// `#[tessel(origin = "...")]`.
///
/// ```rust
/// use tessel::{Database, Link, LinkingObjects, List, Object, Persisted};
///
/// #[derive(Default, Object)]
/// struct Person {
///     dogs: List<Link<Dog>>,
/// }
///
/// #[derive(Default, Object)]
/// struct Dog {
///     name: Persisted<String>,
///     #[tessel(origin = "dogs")]
///     owners: LinkingObjects<Person>,
/// }
///
/// let db = Database::in_memory();
/// let mut rex = Dog::default();
/// let rex_key = db.add(&mut rex).unwrap();
///
/// let mut ann = Person::default();
/// ann.dogs.push(Link::new(rex_key)).unwrap();
/// let ann_key = db.add(&mut ann).unwrap();
///
/// assert_eq!(rex.owners.keys().unwrap(), vec![ann_key]);
/// ```
pub struct LinkingObjects<T> {
    slot: Option<Slot>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: ObjectType> LinkingObjects<T> {
    pub fn new() -> Self {
        Self {
            slot: None,
            _marker: PhantomData,
        }
    }

    /// Keys of the linking objects, in creation order. Always empty before
    /// the owner is added.
    pub fn keys(&self) -> Result<Vec<ObjectKey>> {
        let Some(slot) = &self.slot else {
            return Ok(Vec::new());
        };
        if !slot.storage().is_live(slot.object()) {
            return Err(Error::ObjectInvalidated(slot.object()));
        }
        Ok(slot
            .storage()
            .backlinks(T::CLASS_NAME, slot.column(), slot.object()))
    }

    pub fn to_vec(&self) -> Result<Vec<Link<T>>> {
        Ok(self.keys()?.into_iter().map(Link::new).collect())
    }

    pub fn len(&self) -> Result<usize> {
        self.keys().map(|keys| keys.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.keys().map(|keys| keys.is_empty())
    }

    pub fn get(&self, index: usize) -> Result<Option<Link<T>>> {
        Ok(self.keys()?.get(index).copied().map(Link::new))
    }
}

impl<T: ObjectType> Default for LinkingObjects<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for LinkingObjects<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for LinkingObjects<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LinkingObjects").field(&self.slot).finish()
    }
}

impl<T: ObjectType> LinkOrigin for LinkingObjects<T> {
    fn origin_class() -> &'static str {
        T::CLASS_NAME
    }
}

impl<T: ObjectType> Accessor for LinkingObjects<T> {
    fn read(&self) -> Result<ManagedValue> {
        Ok(ManagedValue::List(
            self.keys()?.into_iter().map(ManagedValue::Link).collect(),
        ))
    }

    fn write(&mut self, _value: ManagedValue) -> Result<()> {
        Err(Error::ReadOnlyProperty {
            class: T::CLASS_NAME.to_string(),
            property: self
                .slot
                .as_ref()
                .map(|slot| slot.column().to_string())
                .unwrap_or_default(),
        })
    }

    /// The slot's column is the origin property of `T`.
    fn bind(&mut self, slot: Slot) {
        self.slot = Some(slot);
    }

    fn slot(&self) -> Option<&Slot> {
        self.slot.as_ref()
    }
}
