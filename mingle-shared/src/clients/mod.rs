pub mod blob;
pub mod embeddings;
pub mod store;
