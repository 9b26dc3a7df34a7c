//! Data module - raw export loading, canonicalization and unification

pub mod cache;
pub mod coerce;
pub mod currency;
pub mod loader;
pub mod mapping;
pub mod processor;
pub mod schema;
pub mod store;

pub use cache::YearlyCache;
pub use loader::{discover_raw_files, DataLoader, Encoding, LoaderError};
pub use mapping::{ReadParams, SourceYear};
pub use processor::DataProcessor;
pub use schema::{CanonicalColumn, FieldKind};
pub use store::{load_preprocessed_dataset, save_preprocessed, OutputPaths};
