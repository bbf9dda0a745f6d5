//! Services module
//!
//! Application-level helpers around the logbook tree: settings persistence,
//! attachment import and background loading.

pub mod attachments;
pub mod loader;
pub mod settings;

pub use attachments::AttachmentsService;
pub use loader::{load_for_rewrite, load_in_background};
pub use settings::SettingsService;
