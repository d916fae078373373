//! Gateway facade over the remote project-management API

mod facade;
mod search;

pub use facade::{AttachmentContent, EntityTypeInspection, Gateway};
pub use search::{DEFAULT_TAKE, MAX_TAKE, SearchRequest};
