//! File-backed implementation of the `DurableStore` contract.

pub mod json_file_store;

pub use json_file_store::JsonFileStore;
