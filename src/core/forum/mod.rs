// Forum module - public board logic

pub mod forum_models;
mod forum_service;

pub use forum_models::{
    NewPost, NewThread, Post, PostView, Thread, ThreadPage, ThreadScope, ThreadView, ANONYMOUS,
};
pub use forum_service::{ForumError, ForumService, ForumStore};
