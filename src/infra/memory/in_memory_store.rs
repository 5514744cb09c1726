// In-memory implementation of every storage port.
//
// One struct backs accounts, schools and forum content so that thread
// listings can join author names the same way the SQLite stores do.
// Cloning is cheap: all clones share the same maps.

use crate::core::accounts::{AccountError, AccountStore, NewUser, Role, User};
use crate::core::forum::{ForumError, ForumStore, NewPost, NewThread, Post, Thread, ThreadScope};
use crate::core::schools::{School, SchoolError, SchoolStore};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Thread row without the joined author name.
#[derive(Clone, Debug)]
struct StoredThread(Thread);

#[derive(Clone, Debug)]
struct StoredPost(Post);

#[derive(Default)]
struct Tables {
    next_id: AtomicI64,
    users: DashMap<i64, User>,
    /// Username -> user id, keeps usernames unique.
    usernames: DashMap<String, i64>,
    schools: DashMap<i64, School>,
    threads: DashMap<i64, StoredThread>,
    posts: DashMap<i64, StoredPost>,
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> i64 {
        self.tables.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn author_of(&self, user_id: Option<i64>) -> Option<String> {
        user_id.and_then(|id| self.tables.users.get(&id).map(|u| u.username.clone()))
    }

    fn thread_with_author(&self, stored: &StoredThread) -> Thread {
        let mut thread = stored.0.clone();
        thread.author = self.author_of(thread.user_id);
        thread
    }

    fn post_with_author(&self, stored: &StoredPost) -> Post {
        let mut post = stored.0.clone();
        post.author = self.author_of(post.user_id);
        post
    }
}

#[async_trait]
impl AccountStore for InMemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, AccountError> {
        let id = match self.tables.usernames.entry(user.username.clone()) {
            Entry::Occupied(_) => return Err(AccountError::UsernameTaken(user.username)),
            Entry::Vacant(slot) => {
                let id = self.next_id();
                slot.insert(id);
                id
            }
        };

        let stored = User {
            id,
            username: user.username,
            password_hash: user.password_hash,
            role: user.role,
            school_id: user.school_id,
            created: Utc::now(),
        };
        self.tables.users.insert(id, stored.clone());
        Ok(stored)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AccountError> {
        let id = self.tables.usernames.get(username).map(|id| *id);
        Ok(id.and_then(|id| self.tables.users.get(&id).map(|u| u.clone())))
    }

    async fn find_by_id(&self, user_id: i64) -> Result<Option<User>, AccountError> {
        Ok(self.tables.users.get(&user_id).map(|u| u.clone()))
    }

    async fn update_password(
        &self,
        user_id: i64,
        password_hash: &str,
    ) -> Result<(), AccountError> {
        if let Some(mut user) = self.tables.users.get_mut(&user_id) {
            user.password_hash = password_hash.to_string();
        }
        Ok(())
    }

    async fn delete_user(&self, user_id: i64) -> Result<(), AccountError> {
        if let Some((_, user)) = self.tables.users.remove(&user_id) {
            self.tables.usernames.remove(&user.username);
        }
        Ok(())
    }

    async fn list_students(&self, school_id: i64) -> Result<Vec<User>, AccountError> {
        let mut students: Vec<User> = self
            .tables
            .users
            .iter()
            .filter(|u| u.role == Role::Student && u.school_id == Some(school_id))
            .map(|u| u.clone())
            .collect();
        students.sort_by_key(|u| u.id);
        Ok(students)
    }

    async fn count_students(&self, school_id: i64) -> Result<u64, AccountError> {
        Ok(self.list_students(school_id).await?.len() as u64)
    }
}

#[async_trait]
impl SchoolStore for InMemoryStore {
    async fn create_school(&self, name: &str, student_limit: u32) -> Result<School, SchoolError> {
        let school = School {
            id: self.next_id(),
            name: name.to_string(),
            student_limit,
            created: Utc::now(),
        };
        self.tables.schools.insert(school.id, school.clone());
        Ok(school)
    }

    async fn get_school(&self, school_id: i64) -> Result<Option<School>, SchoolError> {
        Ok(self.tables.schools.get(&school_id).map(|s| s.clone()))
    }

    async fn list_schools(&self) -> Result<Vec<School>, SchoolError> {
        let mut schools: Vec<School> = self.tables.schools.iter().map(|s| s.clone()).collect();
        schools.sort_by(|a, b| b.created.cmp(&a.created).then(b.id.cmp(&a.id)));
        Ok(schools)
    }

    async fn delete_school(&self, school_id: i64) -> Result<(), SchoolError> {
        self.tables.schools.remove(&school_id);
        Ok(())
    }
}

#[async_trait]
impl ForumStore for InMemoryStore {
    async fn create_thread(&self, thread: NewThread) -> Result<Thread, ForumError> {
        let stored = StoredThread(Thread {
            id: self.next_id(),
            title: thread.title,
            content: thread.content,
            user_id: thread.user_id,
            school_id: thread.school_id,
            created: Utc::now(),
            author: None,
        });
        let result = self.thread_with_author(&stored);
        self.tables.threads.insert(result.id, stored);
        Ok(result)
    }

    async fn get_thread(&self, thread_id: i64) -> Result<Option<Thread>, ForumError> {
        let stored = self.tables.threads.get(&thread_id).map(|t| t.clone());
        Ok(stored.map(|t| self.thread_with_author(&t)))
    }

    async fn list_threads(
        &self,
        scope: ThreadScope,
        query: Option<&str>,
    ) -> Result<Vec<Thread>, ForumError> {
        let needle = query.map(str::to_lowercase);
        let stored: Vec<StoredThread> = self
            .tables
            .threads
            .iter()
            .filter(|t| scope.contains(&t.0))
            .filter(|t| match &needle {
                Some(q) => {
                    t.0.title.to_lowercase().contains(q.as_str())
                        || t.0.content.to_lowercase().contains(q.as_str())
                }
                None => true,
            })
            .map(|t| t.clone())
            .collect();

        let mut threads: Vec<Thread> = stored.iter().map(|t| self.thread_with_author(t)).collect();
        threads.sort_by(|a, b| b.created.cmp(&a.created).then(b.id.cmp(&a.id)));
        Ok(threads)
    }

    async fn update_thread(
        &self,
        thread_id: i64,
        title: &str,
        content: &str,
    ) -> Result<(), ForumError> {
        if let Some(mut stored) = self.tables.threads.get_mut(&thread_id) {
            stored.0.title = title.to_string();
            stored.0.content = content.to_string();
        }
        Ok(())
    }

    async fn delete_thread(&self, thread_id: i64) -> Result<(), ForumError> {
        self.tables.posts.retain(|_, p| p.0.thread_id != thread_id);
        self.tables.threads.remove(&thread_id);
        Ok(())
    }

    async fn create_post(&self, post: NewPost) -> Result<Post, ForumError> {
        let stored = StoredPost(Post {
            id: self.next_id(),
            thread_id: post.thread_id,
            content: post.content,
            user_id: post.user_id,
            created: Utc::now(),
            author: None,
        });
        let result = self.post_with_author(&stored);
        self.tables.posts.insert(result.id, stored);
        Ok(result)
    }

    async fn get_post(&self, post_id: i64) -> Result<Option<Post>, ForumError> {
        let stored = self.tables.posts.get(&post_id).map(|p| p.clone());
        Ok(stored.map(|p| self.post_with_author(&p)))
    }

    async fn list_posts(&self, thread_id: i64) -> Result<Vec<Post>, ForumError> {
        let stored: Vec<StoredPost> = self
            .tables
            .posts
            .iter()
            .filter(|p| p.0.thread_id == thread_id)
            .map(|p| p.clone())
            .collect();

        let mut posts: Vec<Post> = stored.iter().map(|p| self.post_with_author(p)).collect();
        posts.sort_by(|a, b| a.created.cmp(&b.created).then(a.id.cmp(&b.id)));
        Ok(posts)
    }

    async fn update_post(&self, post_id: i64, content: &str) -> Result<(), ForumError> {
        if let Some(mut stored) = self.tables.posts.get_mut(&post_id) {
            stored.0.content = content.to_string();
        }
        Ok(())
    }

    async fn delete_post(&self, post_id: i64) -> Result<(), ForumError> {
        self.tables.posts.remove(&post_id);
        Ok(())
    }
}
