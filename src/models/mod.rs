//! Data models for the client gallery.
//!
//! The persisted records serialize to exactly the `clients` JSON layout already
//! found in saved data; session-scoped fields are skipped.

mod client;
mod video;
mod view;

pub use client::*;
pub use video::*;
pub use view::*;
