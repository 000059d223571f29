//! Typed operations over vertex and edge collections, traversals, upsert
//! helpers and search-view queries (the "Graph Store Adapter" component).
//! Real wiring goes through [`arango::ArangoStore`]; tests elsewhere in the
//! workspace use [`memory::InMemoryGraphStore`] through the [`GraphStore`]
//! trait seam, the way the teacher keeps `sqlx::PgPool` behind `repo`
//! functions rather than letting handlers talk to Postgres directly.

pub mod arango;
pub mod error;
pub mod memory;
pub mod store;

pub use arango::ArangoStore;
pub use error::GraphError;
pub use memory::InMemoryGraphStore;
pub use store::{Direction, GraphStore, ScoredDocument};

pub mod collections {
    pub use dms_types::edges::*;
}
