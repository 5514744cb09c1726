// Forum domain models - threads, replies and their moderated views.

use crate::core::moderation::Moderated;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// Shown when a thread or post has no (remaining) author.
pub const ANONYMOUS: &str = "Anon";

/// A thread on the public forum (`school_id == None`) or on a school's
/// spotted board.
#[derive(Debug, Clone, PartialEq)]
pub struct Thread {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub user_id: Option<i64>,
    pub school_id: Option<i64>,
    pub created: DateTime<Utc>,
    /// Author username, joined in by the store.
    pub author: Option<String>,
}

/// A reply inside a thread.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub id: i64,
    pub thread_id: i64,
    pub content: String,
    pub user_id: Option<i64>,
    pub created: DateTime<Utc>,
    pub author: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewThread {
    pub title: String,
    pub content: String,
    pub user_id: Option<i64>,
    pub school_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub thread_id: i64,
    pub content: String,
    pub user_id: Option<i64>,
}

/// Which board a listing reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadScope {
    Public,
    School(i64),
}

impl ThreadScope {
    pub fn school_id(&self) -> Option<i64> {
        match self {
            ThreadScope::Public => None,
            ThreadScope::School(id) => Some(*id),
        }
    }

    pub fn contains(&self, thread: &Thread) -> bool {
        thread.school_id == self.school_id()
    }
}

/// A thread ready for display: title and body already went through the
/// content moderator.
///
/// Serializes without the stored text; only the moderated fields go out.
#[derive(Debug, Clone)]
pub struct ThreadView {
    pub thread: Thread,
    pub title: Moderated,
    pub body: Moderated,
}

impl ThreadView {
    pub fn author_name(&self) -> &str {
        self.thread.author.as_deref().unwrap_or(ANONYMOUS)
    }
}

#[derive(Debug, Clone)]
pub struct PostView {
    pub post: Post,
    pub body: Moderated,
}

impl PostView {
    pub fn author_name(&self) -> &str {
        self.post.author.as_deref().unwrap_or(ANONYMOUS)
    }
}

#[derive(Serialize)]
struct ThreadOut<'a> {
    id: i64,
    school_id: Option<i64>,
    author: &'a str,
    created: DateTime<Utc>,
    title: &'a Moderated,
    body: &'a Moderated,
}

#[derive(Serialize)]
struct PostOut<'a> {
    id: i64,
    thread_id: i64,
    author: &'a str,
    created: DateTime<Utc>,
    body: &'a Moderated,
}

impl Serialize for ThreadView {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ThreadOut {
            id: self.thread.id,
            school_id: self.thread.school_id,
            author: self.author_name(),
            created: self.thread.created,
            title: &self.title,
            body: &self.body,
        }
        .serialize(serializer)
    }
}

impl Serialize for PostView {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        PostOut {
            id: self.post.id,
            thread_id: self.post.thread_id,
            author: self.author_name(),
            created: self.post.created,
            body: &self.body,
        }
        .serialize(serializer)
    }
}

/// A thread with all of its replies, oldest reply first.
#[derive(Debug, Clone, Serialize)]
pub struct ThreadPage {
    pub thread: ThreadView,
    pub posts: Vec<PostView>,
}
