//! hybridrag-vector
//!
//! Vector side of retrieval. `VectorSearchAdapter` turns a query into ranked
//! hits over any [`hybridrag_core::traits::VectorIndex`]; two indexes ship
//! with the crate, a brute-force in-memory one and a LanceDB table.
pub mod adapter;
pub mod lance;
pub mod memory;
pub mod schema;

pub use adapter::{distance_to_similarity, VectorSearchAdapter};
pub use lance::LanceVectorIndex;
pub use memory::MemoryVectorIndex;
