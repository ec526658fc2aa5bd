//! Collection properties.
//!
//! [`List`], [`MutableSet`] and [`Map`] are handles fixed when the owning
//! object is created. Mutations go through the handle; in managed mode each
//! mutation is a single write of the whole collection value.

use crate::{
    accessor::{Accessor, Slot, State},
    error::Result,
    Error, Managed, ManagedValue, Reflect, TypeShape,
};
use std::collections::BTreeMap;
use std::fmt;

fn expected(kind: &str, got: &ManagedValue) -> Error {
    Error::ValueConversion {
        expected: kind.to_string(),
        got: got.type_name().to_string(),
    }
}

fn elements<T: Managed>(items: Vec<ManagedValue>) -> Result<Vec<T>> {
    items.into_iter().map(T::from_value).collect()
}

fn values<T: Managed>(items: &[T]) -> Vec<ManagedValue> {
    items.iter().map(Managed::to_value).collect()
}

/// Ordered list property.
#[derive(Clone)]
pub struct List<T> {
    state: State<Vec<T>>,
}

impl<T: Managed> List<T> {
    pub fn new() -> Self {
        Self {
            state: State::Unmanaged(Vec::new()),
        }
    }

    fn load(slot: &Slot) -> Result<Vec<T>> {
        match slot.read()? {
            ManagedValue::List(items) => elements(items),
            other => Err(expected("list", &other)),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&[T]) -> R) -> Result<R> {
        match &self.state {
            State::Unmanaged(items) => Ok(f(items)),
            State::Managed(slot) => Ok(f(&Self::load(slot)?)),
        }
    }

    fn modify<R>(&mut self, f: impl FnOnce(&mut Vec<T>) -> Result<R>) -> Result<R> {
        match &mut self.state {
            State::Unmanaged(items) => f(items),
            State::Managed(slot) => {
                let mut items = Self::load(slot)?;
                let result = f(&mut items)?;
                slot.write(ManagedValue::List(values(&items)))?;
                Ok(result)
            }
        }
    }

    pub fn len(&self) -> Result<usize> {
        self.with(<[T]>::len)
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.with(<[T]>::is_empty)
    }

    pub fn get(&self, index: usize) -> Result<Option<T>> {
        self.with(|items| items.get(index).cloned())
    }

    pub fn to_vec(&self) -> Result<Vec<T>> {
        self.with(<[T]>::to_vec)
    }

    pub fn push(&mut self, value: T) -> Result<()> {
        self.modify(|items| {
            items.push(value);
            Ok(())
        })
    }

    pub fn insert(&mut self, index: usize, value: T) -> Result<()> {
        self.modify(|items| {
            if index > items.len() {
                return Err(Error::IndexOutOfBounds {
                    index,
                    len: items.len(),
                });
            }
            items.insert(index, value);
            Ok(())
        })
    }

    /// Replace the element at `index`, returning the previous one.
    pub fn set(&mut self, index: usize, value: T) -> Result<T> {
        self.modify(|items| {
            let len = items.len();
            let element = items
                .get_mut(index)
                .ok_or(Error::IndexOutOfBounds { index, len })?;
            Ok(std::mem::replace(element, value))
        })
    }

    pub fn remove(&mut self, index: usize) -> Result<T> {
        self.modify(|items| {
            if index >= items.len() {
                return Err(Error::IndexOutOfBounds {
                    index,
                    len: items.len(),
                });
            }
            Ok(items.remove(index))
        })
    }

    pub fn clear(&mut self) -> Result<()> {
        self.modify(|items| {
            items.clear();
            Ok(())
        })
    }
}

impl<T: Managed> Default for List<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Managed> From<Vec<T>> for List<T> {
    fn from(items: Vec<T>) -> Self {
        Self {
            state: State::Unmanaged(items),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for List<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("List").field(&self.state).finish()
    }
}

impl<T: Managed> Reflect for List<T> {
    fn shape() -> TypeShape {
        TypeShape::list(T::shape())
    }
}

impl<T: Managed> Accessor for List<T> {
    fn read(&self) -> Result<ManagedValue> {
        self.with(|items| ManagedValue::List(values(items)))
    }

    fn write(&mut self, value: ManagedValue) -> Result<()> {
        let items = match value {
            ManagedValue::List(items) => elements::<T>(items)?,
            other => return Err(expected("list", &other)),
        };
        self.modify(|current| {
            *current = items;
            Ok(())
        })
    }

    fn bind(&mut self, slot: Slot) {
        self.state = State::Managed(slot);
    }

    fn slot(&self) -> Option<&Slot> {
        self.state.slot()
    }
}

/// Unordered set property. Elements are unique; iteration follows insertion
/// order.
#[derive(Clone)]
pub struct MutableSet<T> {
    state: State<Vec<T>>,
}

impl<T: Managed + PartialEq> MutableSet<T> {
    pub fn new() -> Self {
        Self {
            state: State::Unmanaged(Vec::new()),
        }
    }

    fn load(slot: &Slot) -> Result<Vec<T>> {
        match slot.read()? {
            ManagedValue::Set(items) => elements(items),
            other => Err(expected("set", &other)),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&[T]) -> R) -> Result<R> {
        match &self.state {
            State::Unmanaged(items) => Ok(f(items)),
            State::Managed(slot) => Ok(f(&Self::load(slot)?)),
        }
    }

    fn modify<R>(&mut self, f: impl FnOnce(&mut Vec<T>) -> R) -> Result<R> {
        match &mut self.state {
            State::Unmanaged(items) => Ok(f(items)),
            State::Managed(slot) => {
                let mut items = Self::load(slot)?;
                let result = f(&mut items);
                slot.write(ManagedValue::Set(values(&items)))?;
                Ok(result)
            }
        }
    }

    fn dedup(items: Vec<T>) -> Vec<T> {
        let mut unique: Vec<T> = Vec::with_capacity(items.len());
        for item in items {
            if !unique.contains(&item) {
                unique.push(item);
            }
        }
        unique
    }

    pub fn len(&self) -> Result<usize> {
        self.with(<[T]>::len)
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.with(<[T]>::is_empty)
    }

    pub fn contains(&self, value: &T) -> Result<bool> {
        self.with(|items| items.contains(value))
    }

    pub fn to_vec(&self) -> Result<Vec<T>> {
        self.with(<[T]>::to_vec)
    }

    /// Add `value`. Returns whether it was newly inserted.
    pub fn insert(&mut self, value: T) -> Result<bool> {
        self.modify(|items| {
            if items.contains(&value) {
                false
            } else {
                items.push(value);
                true
            }
        })
    }

    /// Remove `value`. Returns whether it was present.
    pub fn remove(&mut self, value: &T) -> Result<bool> {
        self.modify(|items| match items.iter().position(|item| item == value) {
            Some(index) => {
                items.remove(index);
                true
            }
            None => false,
        })
    }

    pub fn clear(&mut self) -> Result<()> {
        self.modify(Vec::clear)
    }
}

impl<T: Managed + PartialEq> Default for MutableSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Managed + PartialEq> FromIterator<T> for MutableSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            state: State::Unmanaged(Self::dedup(iter.into_iter().collect())),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for MutableSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MutableSet").field(&self.state).finish()
    }
}

impl<T: Managed + PartialEq> Reflect for MutableSet<T> {
    fn shape() -> TypeShape {
        TypeShape::set(T::shape())
    }
}

impl<T: Managed + PartialEq> Accessor for MutableSet<T> {
    fn read(&self) -> Result<ManagedValue> {
        self.with(|items| ManagedValue::Set(values(items)))
    }

    fn write(&mut self, value: ManagedValue) -> Result<()> {
        let items = match value {
            ManagedValue::Set(items) => Self::dedup(elements::<T>(items)?),
            other => return Err(expected("set", &other)),
        };
        self.modify(|current| *current = items)
    }

    fn bind(&mut self, slot: Slot) {
        self.state = State::Managed(slot);
    }

    fn slot(&self) -> Option<&Slot> {
        self.state.slot()
    }
}

/// String-keyed map property.
#[derive(Clone)]
pub struct Map<T> {
    state: State<BTreeMap<String, T>>,
}

impl<T: Managed> Map<T> {
    pub fn new() -> Self {
        Self {
            state: State::Unmanaged(BTreeMap::new()),
        }
    }

    fn entries(raw: BTreeMap<String, ManagedValue>) -> Result<BTreeMap<String, T>> {
        raw.into_iter()
            .map(|(key, value)| Ok((key, T::from_value(value)?)))
            .collect()
    }

    fn raw(entries: &BTreeMap<String, T>) -> ManagedValue {
        ManagedValue::Map(
            entries
                .iter()
                .map(|(key, value)| (key.clone(), value.to_value()))
                .collect(),
        )
    }

    fn load(slot: &Slot) -> Result<BTreeMap<String, T>> {
        match slot.read()? {
            ManagedValue::Map(raw) => Self::entries(raw),
            other => Err(expected("map", &other)),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&BTreeMap<String, T>) -> R) -> Result<R> {
        match &self.state {
            State::Unmanaged(entries) => Ok(f(entries)),
            State::Managed(slot) => Ok(f(&Self::load(slot)?)),
        }
    }

    fn modify<R>(&mut self, f: impl FnOnce(&mut BTreeMap<String, T>) -> R) -> Result<R> {
        match &mut self.state {
            State::Unmanaged(entries) => Ok(f(entries)),
            State::Managed(slot) => {
                let mut entries = Self::load(slot)?;
                let result = f(&mut entries);
                slot.write(Self::raw(&entries))?;
                Ok(result)
            }
        }
    }

    pub fn len(&self) -> Result<usize> {
        self.with(BTreeMap::len)
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.with(BTreeMap::is_empty)
    }

    pub fn get(&self, key: &str) -> Result<Option<T>> {
        self.with(|entries| entries.get(key).cloned())
    }

    pub fn contains_key(&self, key: &str) -> Result<bool> {
        self.with(|entries| entries.contains_key(key))
    }

    pub fn keys(&self) -> Result<Vec<String>> {
        self.with(|entries| entries.keys().cloned().collect())
    }

    pub fn to_map(&self) -> Result<BTreeMap<String, T>> {
        self.with(BTreeMap::clone)
    }

    /// Insert or replace, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: T) -> Result<Option<T>> {
        let key = key.into();
        self.modify(|entries| entries.insert(key, value))
    }

    pub fn remove(&mut self, key: &str) -> Result<Option<T>> {
        self.modify(|entries| entries.remove(key))
    }

    pub fn clear(&mut self) -> Result<()> {
        self.modify(BTreeMap::clear)
    }
}

impl<T: Managed> Default for Map<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Managed> From<BTreeMap<String, T>> for Map<T> {
    fn from(entries: BTreeMap<String, T>) -> Self {
        Self {
            state: State::Unmanaged(entries),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Map<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Map").field(&self.state).finish()
    }
}

impl<T: Managed> Reflect for Map<T> {
    fn shape() -> TypeShape {
        TypeShape::map(T::shape())
    }
}

impl<T: Managed> Accessor for Map<T> {
    fn read(&self) -> Result<ManagedValue> {
        self.with(Self::raw)
    }

    fn write(&mut self, value: ManagedValue) -> Result<()> {
        let entries = match value {
            ManagedValue::Map(raw) => Self::entries(raw)?,
            other => return Err(expected("map", &other)),
        };
        self.modify(|current| *current = entries)
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
    use crate::{CollectionKind, MemoryStore, PropertyType, Storage};
    use std::sync::Arc;

    fn bind_to_store<A: Accessor>(accessor: &mut A, column: &str) -> (Arc<dyn Storage>, u64) {
        let store: Arc<dyn Storage> = Arc::new(MemoryStore::new());
        let mut values = BTreeMap::new();
        values.insert(column.to_string(), accessor.read().unwrap());
        let key = store.create("Dog", None, values).unwrap();
        accessor.bind(Slot::new(Arc::clone(&store), key, column));
        (store, key)
    }

    #[test]
    fn list_operations_unmanaged() {
        let mut list: List<i64> = List::new();
        list.push(1).unwrap();
        list.push(3).unwrap();
        list.insert(1, 2).unwrap();
        assert_eq!(list.to_vec().unwrap(), vec![1, 2, 3]);
        assert_eq!(list.set(0, 10).unwrap(), 1);
        assert_eq!(list.remove(2).unwrap(), 3);
        assert_eq!(list.to_vec().unwrap(), vec![10, 2]);
        assert!(matches!(
            list.remove(5),
            Err(Error::IndexOutOfBounds { index: 5, len: 2 })
        ));
    }

    #[test]
    fn list_operations_managed() {
        let mut list = List::from(vec!["a".to_string()]);
        let (store, key) = bind_to_store(&mut list, "names");

        list.push("b".to_string()).unwrap();
        assert_eq!(
            store.read(key, "names").unwrap(),
            ManagedValue::List(vec![ManagedValue::from("a"), ManagedValue::from("b")])
        );
        assert_eq!(list.len().unwrap(), 2);
        assert_eq!(list.get(1).unwrap().as_deref(), Some("b"));

        list.clear().unwrap();
        assert!(list.is_empty().unwrap());
    }

    #[test]
    fn failed_mutation_does_not_write() {
        let mut list = List::from(vec![1i64]);
        let (store, key) = bind_to_store(&mut list, "scores");
        assert!(list.insert(9, 5).is_err());
        assert_eq!(
            store.read(key, "scores").unwrap(),
            ManagedValue::List(vec![ManagedValue::Int(1)])
        );
    }

    #[test]
    fn set_keeps_unique_elements() {
        let mut set: MutableSet<String> = ["x", "y", "x"].iter().map(|s| s.to_string()).collect();
        assert_eq!(set.len().unwrap(), 2);
        let (_store, _key) = bind_to_store(&mut set, "tags");

        assert!(!set.insert("y".to_string()).unwrap());
        assert!(set.insert("z".to_string()).unwrap());
        assert!(set.contains(&"z".to_string()).unwrap());
        assert!(set.remove(&"x".to_string()).unwrap());
        assert!(!set.remove(&"x".to_string()).unwrap());
        assert_eq!(set.to_vec().unwrap(), vec!["y".to_string(), "z".to_string()]);
    }

    #[test]
    fn map_operations() {
        let mut map: Map<Option<i64>> = Map::new();
        map.insert("a", Some(1)).unwrap();
        let (store, key) = bind_to_store(&mut map, "counts");

        assert_eq!(map.insert("b", None).unwrap(), None);
        assert_eq!(map.insert("a", Some(2)).unwrap(), Some(Some(1)));
        assert_eq!(map.keys().unwrap(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(map.get("b").unwrap(), Some(None));
        assert_eq!(map.remove("a").unwrap(), Some(Some(2)));

        let mut expected = BTreeMap::new();
        expected.insert("b".to_string(), ManagedValue::Null);
        assert_eq!(store.read(key, "counts").unwrap(), ManagedValue::Map(expected));
    }

    #[test]
    fn write_replaces_contents() {
        let mut list: List<bool> = List::new();
        list.write(ManagedValue::List(vec![ManagedValue::Bool(true)])).unwrap();
        assert_eq!(list.to_vec().unwrap(), vec![true]);
        assert!(list.write(ManagedValue::Set(vec![])).is_err());
        assert!(list
            .write(ManagedValue::List(vec![ManagedValue::Int(1)]))
            .is_err());
    }

    #[test]
    fn set_write_requires_a_set() {
        let mut set: MutableSet<i32> = MutableSet::new();
        let err = set
            .write(ManagedValue::List(vec![ManagedValue::Int(1)]))
            .unwrap_err();
        assert_eq!(
            err,
            Error::ValueConversion {
                expected: "set".into(),
                got: "list".into(),
            }
        );

        set.write(ManagedValue::Set(vec![ManagedValue::Int(2), ManagedValue::Int(2)]))
            .unwrap();
        assert_eq!(set.to_vec().unwrap(), vec![2]);
    }

    #[test]
    fn shapes() {
        assert_eq!(
            <List<i32> as Reflect>::shape(),
            TypeShape::Collection(
                CollectionKind::List,
                Box::new(TypeShape::Scalar(PropertyType::Int))
            )
        );
        assert_eq!(
            <MutableSet<Option<String>> as Reflect>::shape(),
            TypeShape::set(TypeShape::optional(TypeShape::Scalar(PropertyType::String)))
        );
        assert_eq!(
            <Map<f64> as Reflect>::shape(),
            TypeShape::map(TypeShape::Scalar(PropertyType::Double))
        );
    }
}
