//! Reactive [`HashMap`] keyed by ids of tracked entities.

use std::{
    cell::RefCell,
    collections::{hash_map, HashMap},
    hash::Hash,
};

use futures::{channel::mpsc, stream::LocalBoxStream};

/// Subscribers to one kind of [`ObservableHashMap`] modification.
type Subs<K, V> = RefCell<Vec<mpsc::UnboundedSender<(K, V)>>>;

/// [`HashMap`] which emits its insertions and removals to subscribers.
///
/// ```
/// # use futures::{executor, StreamExt as _};
/// use conclave_reactive::ObservableHashMap;
///
/// # executor::block_on(async {
/// let mut rooms = ObservableHashMap::new();
/// rooms.insert("lobby", 1);
///
/// // Already present entries are replayed to new insert subscribers.
/// let mut joined = rooms.on_insert();
/// assert_eq!(joined.next().await, Some(("lobby", 1)));
///
/// let mut left = rooms.on_remove();
/// rooms.remove(&"lobby");
/// assert_eq!(left.next().await, Some(("lobby", 1)));
/// # });
/// ```
#[derive(Debug)]
pub struct ObservableHashMap<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    store: HashMap<K, V>,
    on_insert_subs: Subs<K, V>,
    on_remove_subs: Subs<K, V>,
}

impl<K, V> ObservableHashMap<K, V>
where
    K: Clone + Eq + Hash + 'static,
    V: Clone + 'static,
{
    /// Returns a new empty [`ObservableHashMap`].
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts the provided `value` under the provided `key`, returning the
    /// replaced value, if any.
    ///
    /// A replaced value is emitted to [`ObservableHashMap::on_remove`]
    /// subscribers before the new one is emitted to
    /// [`ObservableHashMap::on_insert`] subscribers.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let replaced = self.store.insert(key.clone(), value.clone());
        if let Some(old) = &replaced {
            Self::emit(&self.on_remove_subs, &key, old);
        }
        Self::emit(&self.on_insert_subs, &key, &value);
        replaced
    }

    /// Removes the value stored under the provided `key`, emitting it to
    /// [`ObservableHashMap::on_remove`] subscribers.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let removed = self.store.remove(key);
        if let Some(value) = &removed {
            Self::emit(&self.on_remove_subs, key, value);
        }
        removed
    }

    /// Returns a [`LocalBoxStream`] of inserted entries.
    ///
    /// Entries present at the moment of subscription are emitted first.
    pub fn on_insert(&self) -> LocalBoxStream<'static, (K, V)> {
        let (tx, rx) = mpsc::unbounded();
        for (key, value) in &self.store {
            let _ = tx.unbounded_send((key.clone(), value.clone()));
        }
        self.on_insert_subs.borrow_mut().push(tx);
        Box::pin(rx)
    }

    /// Returns a [`LocalBoxStream`] of removed entries.
    ///
    /// All the remaining entries are emitted when this [`ObservableHashMap`]
    /// is dropped.
    pub fn on_remove(&self) -> LocalBoxStream<'static, (K, V)> {
        let (tx, rx) = mpsc::unbounded();
        self.on_remove_subs.borrow_mut().push(tx);
        Box::pin(rx)
    }

    #[inline]
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.store.get(key)
    }

    #[inline]
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.store.contains_key(key)
    }

    #[inline]
    pub fn iter(&self) -> hash_map::Iter<'_, K, V> {
        self.store.iter()
    }

    #[inline]
    pub fn keys(&self) -> hash_map::Keys<'_, K, V> {
        self.store.keys()
    }

    #[inline]
    pub fn values(&self) -> hash_map::Values<'_, K, V> {
        self.store.values()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Sends the provided entry to the provided subscribers, forgetting the
    /// ones whose receivers are gone.
    fn emit(subs: &Subs<K, V>, key: &K, value: &V) {
        subs.borrow_mut().retain(|sub| {
            sub.unbounded_send((key.clone(), value.clone())).is_ok()
        });
    }
}

impl<K, V> Default for ObservableHashMap<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self {
            store: HashMap::new(),
            on_insert_subs: RefCell::new(Vec::new()),
            on_remove_subs: RefCell::new(Vec::new()),
        }
    }
}

impl<K, V> Drop for ObservableHashMap<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    fn drop(&mut self) {
        let subs = self.on_remove_subs.borrow();
        for (key, value) in self.store.drain() {
            for sub in subs.iter() {
                let _ = sub.unbounded_send((key.clone(), value.clone()));
            }
        }
    }
}

impl<'a, K, V> IntoIterator for &'a ObservableHashMap<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    type IntoIter = hash_map::Iter<'a, K, V>;
    type Item = (&'a K, &'a V);

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.store.iter()
    }
}
