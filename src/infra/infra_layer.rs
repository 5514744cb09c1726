// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "accounts/mod.rs"]
pub mod accounts;

#[path = "database.rs"]
pub mod database;

#[path = "forum/mod.rs"]
pub mod forum;

#[path = "schools/mod.rs"]
pub mod schools;

#[cfg(test)]
#[path = "memory/in_memory_store.rs"]
pub mod memory;
