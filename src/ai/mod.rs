pub mod client;
pub mod credentials;
pub mod http_client;
pub mod organizer;
pub mod prompts;

pub use client::{ClassificationService, GeminiClient};
pub use organizer::{CoverageReport, OrganizeError, Organizer};
