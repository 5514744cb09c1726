// Accounts module - registration, login and roles

pub mod account_models;
mod account_service;
pub mod password;

pub use account_models::{Landing, NewUser, Role, Session, User};
pub use account_service::{AccountConfig, AccountError, AccountService, AccountStore};
