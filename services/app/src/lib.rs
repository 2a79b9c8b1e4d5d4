pub mod adapters;
pub mod config;
pub mod error;
pub mod flow;
pub mod session;
pub mod validate;

pub use config::Config;
pub use error::AppError;
pub use flow::{AppFlow, Phase};
pub use session::SessionTracker;
