pub mod api;
pub mod controller;
pub mod download;

pub use api::{GenerationApi, HttpGenerationApi};
pub use controller::{GenerationController, GenerationOptions, GenerationState, Notice, NoticeLevel};
pub use download::{download_file_name, download_video};
