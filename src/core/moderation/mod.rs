// Core moderation module - profanity filter and rendering helpers.
// Following the same pattern as the other core modules.

pub mod moderation_models;
pub mod moderation_service;
pub mod rendering;

pub use moderation_models::*;
pub use moderation_service::*;
pub use rendering::{escape_html, render_multiline};
