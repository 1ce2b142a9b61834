pub mod client;
pub mod config;
pub mod error;
pub mod library;
pub mod models;
pub mod server;
pub mod storage;
pub mod upstream;

pub use config::AppConfig;
pub use error::AppError;
pub use library::VideoLibrary;
pub use models::{GenerationRequest, GenerationResult, GenerationStatus};
