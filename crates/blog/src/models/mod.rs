//! Domain models for blog entities

mod post;
mod record;
mod subscriber;

pub use post::{Category, Post, PostDraft};
pub use record::{Record, RecordId, sort_newest_first, unknown_created_at};
pub use subscriber::Subscriber;
