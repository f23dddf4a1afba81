pub mod gemini;

pub use gemini::{file_resource_id, GeminiFileSearch};
