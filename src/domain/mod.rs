pub mod item;
pub mod raw;
pub mod store;

pub use item::{Enrichment, Item};
pub use raw::{Metafields, RawCatalogEntry, RawDetail};
pub use store::StoreContext;
