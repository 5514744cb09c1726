// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "accounts/mod.rs"]
pub mod accounts;

#[path = "forum/mod.rs"]
pub mod forum;

#[path = "moderation/mod.rs"]
pub mod moderation;

#[path = "schools/mod.rs"]
pub mod schools;
