use crate::InternalSchemaRef;
use std::hash::{Hash, Hasher};

/// A schema element id paired with the schema it lives in. Equality and hashing look at the id only.
///
/// The schema itself never stores a `Zipper`; doing so would create an `Arc` cycle.
#[derive(Debug, Clone)]
pub struct Zipper<I> {
    pub id: I,
    pub schema: InternalSchemaRef,
}

impl<I: PartialEq> PartialEq for Zipper<I> {
    fn eq(&self, other: &Self) -> bool {
        self.id.eq(&other.id)
    }
}

impl<I: Eq> Eq for Zipper<I> {}

impl<I: Hash> Hash for Zipper<I> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state)
    }
}
