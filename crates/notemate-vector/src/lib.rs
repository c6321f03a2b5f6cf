//! Vector storage for the retrieval core: an exact flat index, the
//! chunk/index pairing that forms a collection, and its on-disk store.

pub mod collection;
pub mod index;
pub mod store;

pub use collection::{collection_name_for, validate_collection_name, Collection};
pub use index::{squared_l2, DecodeError, FlatIndex};
pub use store::CollectionStore;
