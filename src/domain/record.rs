//! Record Traits
//!
//! What the list core needs to know about an entity: a stable identity for
//! de-duplication across pages, and field lookup for filtering and sorting in
//! sources that evaluate queries locally.

use std::fmt::Debug;
use std::hash::Hash;

use super::filter::FilterValue;

/// An entity with a stable identity key
pub trait Identified {
    type Key: Clone + Eq + Hash + Debug + Send + Sync + 'static;

    /// Identity used to drop an item that shows up again on a later page
    fn key(&self) -> Self::Key;
}

/// An entity whose fields can be read by name
pub trait Record: Identified {
    /// Value of a field, `None` when the entity has no such field
    fn field(&self, name: &str) -> Option<FilterValue>;
}
