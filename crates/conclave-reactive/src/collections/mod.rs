//! Reactive collections based on [`std::collections`].

pub mod hash_map;

#[doc(inline)]
pub use self::hash_map::ObservableHashMap;
