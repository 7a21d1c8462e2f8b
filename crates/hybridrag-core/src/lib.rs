//! Shared configuration, domain types, collaborator traits and document
//! segmentation for the hybridrag workspace.

pub mod config;
pub mod data_processor;
pub mod error;
pub mod segmenter;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
