pub mod http;
pub mod store;

pub use http::HttpBackend;
pub use store::{JsonFileStore, MemoryStore};
