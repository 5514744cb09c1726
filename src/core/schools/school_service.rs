// School service - school registration, student management and the
// school-scoped "spotted" board.
//
// Access rules:
// - Only the teacher and students of a school see its spotted board
// - Only the teacher manages students, moderates posts and exports
// - Everything on the board goes through the same forum helpers (and
//   therefore the same content moderator) as the public forum

use super::export::{export_filename, threads_to_csv};
use super::school_models::{parse_student_limit, CsvExport, Dashboard, School, SpottedFeed};
use crate::core::accounts::{AccountError, AccountService, AccountStore, Role, Session, User};
use crate::core::forum::{ForumError, ForumService, ForumStore, Post, Thread, ThreadPage, ThreadScope};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum SchoolError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error(transparent)]
    Account(#[from] AccountError),

    #[error(transparent)]
    Forum(#[from] ForumError),

    #[error("School or entry not found")]
    NotFound,

    #[error("Only teachers and students of this school have access")]
    Forbidden,

    #[error("Fill in all fields")]
    MissingFields,

    #[error("Student limit of {0} reached")]
    StudentLimitReached(u32),
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

#[async_trait]
pub trait SchoolStore: Send + Sync {
    async fn create_school(&self, name: &str, student_limit: u32) -> Result<School, SchoolError>;

    async fn get_school(&self, school_id: i64) -> Result<Option<School>, SchoolError>;

    /// All schools, newest first.
    async fn list_schools(&self) -> Result<Vec<School>, SchoolError>;

    async fn delete_school(&self, school_id: i64) -> Result<(), SchoolError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct SchoolService<A: AccountStore, S: SchoolStore, F: ForumStore> {
    accounts: Arc<AccountService<A>>,
    forum: Arc<ForumService<F>>,
    store: S,
}

impl<A: AccountStore, S: SchoolStore, F: ForumStore> SchoolService<A, S, F> {
    pub fn new(accounts: Arc<AccountService<A>>, forum: Arc<ForumService<F>>, store: S) -> Self {
        Self {
            accounts,
            forum,
            store,
        }
    }

    pub async fn list_schools(&self) -> Result<Vec<School>, SchoolError> {
        self.store.list_schools().await
    }

    /// Create a school together with its teacher account.
    ///
    /// If the teacher account cannot be created the school is removed again.
    pub async fn register_school(
        &self,
        name: &str,
        student_limit_raw: &str,
        teacher_login: &str,
        teacher_password: &str,
    ) -> Result<(School, User), SchoolError> {
        let name = name.trim();
        let teacher_login = teacher_login.trim();
        if name.is_empty() || teacher_login.is_empty() || teacher_password.is_empty() {
            return Err(SchoolError::MissingFields);
        }
        if !self.accounts.username_available(teacher_login).await? {
            return Err(AccountError::UsernameTaken(teacher_login.to_string()).into());
        }

        let school = self
            .store
            .create_school(name, parse_student_limit(student_limit_raw))
            .await?;

        match self
            .accounts
            .create_account(teacher_login, teacher_password, Role::Teacher, Some(school.id))
            .await
        {
            Ok(teacher) => {
                tracing::info!(school_id = school.id, teacher_id = teacher.id, "School registered");
                Ok((school, teacher))
            }
            Err(err) => {
                tracing::warn!(school_id = school.id, "Teacher creation failed, dropping school: {}", err);
                self.store.delete_school(school.id).await?;
                Err(err.into())
            }
        }
    }

    pub async fn add_student(
        &self,
        teacher: &Session,
        login: &str,
        password: &str,
    ) -> Result<User, SchoolError> {
        let school = self.teacher_school(teacher).await?;
        if login.trim().is_empty() || password.is_empty() {
            return Err(SchoolError::MissingFields);
        }

        let count = self.accounts.student_count(school.id).await?;
        if school.is_full(count) {
            return Err(SchoolError::StudentLimitReached(school.student_limit));
        }

        let student = self
            .accounts
            .create_account(login, password, Role::Student, Some(school.id))
            .await?;
        tracing::info!(school_id = school.id, student_id = student.id, "Student added");
        Ok(student)
    }

    /// Remove a student of the teacher's school. Anything else is ignored;
    /// the return value tells whether an account was removed.
    pub async fn remove_student(
        &self,
        teacher: &Session,
        student_id: i64,
    ) -> Result<bool, SchoolError> {
        let school = self.teacher_school(teacher).await?;
        match self.student_of(school.id, student_id).await? {
            Some(student) => {
                self.accounts.delete_user(student.id).await?;
                tracing::info!(school_id = school.id, student_id, "Student removed");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn reset_student_password(
        &self,
        teacher: &Session,
        student_id: i64,
        new_password: &str,
    ) -> Result<(), SchoolError> {
        let school = self.teacher_school(teacher).await?;
        let student = self
            .student_of(school.id, student_id)
            .await?
            .ok_or(SchoolError::Forbidden)?;
        self.accounts.set_password(student.id, new_password).await?;
        tracing::info!(school_id = school.id, student_id, "Student password reset");
        Ok(())
    }

    pub async fn dashboard(&self, teacher: &Session) -> Result<Dashboard, SchoolError> {
        let school = self.teacher_school(teacher).await?;
        let students = self.accounts.students(school.id).await?;

        let mut threads = Vec::new();
        for thread in self.forum.threads(ThreadScope::School(school.id)).await? {
            threads.push(self.forum.page(thread).await?);
        }

        Ok(Dashboard {
            school,
            students,
            threads,
        })
    }

    pub async fn spotted(
        &self,
        session: Option<&Session>,
        school_id: i64,
    ) -> Result<SpottedFeed, SchoolError> {
        let school = self.member_school(session, school_id).await?;
        let threads = self
            .forum
            .threads(ThreadScope::School(school.id))
            .await?
            .into_iter()
            .map(|t| self.forum.view_thread(t))
            .collect();
        Ok(SpottedFeed { school, threads })
    }

    /// New spotted entry. Unlike the public forum both fields are required.
    pub async fn post_spotted(
        &self,
        session: Option<&Session>,
        school_id: i64,
        title: &str,
        content: &str,
    ) -> Result<Thread, SchoolError> {
        let school = self.member_school(session, school_id).await?;
        let session = session.ok_or(SchoolError::Forbidden)?;
        if title.trim().is_empty() || content.trim().is_empty() {
            return Err(SchoolError::MissingFields);
        }
        Ok(self
            .forum
            .insert_thread(session, title, content, Some(school.id))
            .await?)
    }

    pub async fn school_thread(
        &self,
        session: Option<&Session>,
        thread_id: i64,
    ) -> Result<ThreadPage, SchoolError> {
        let thread = self.member_thread(session, thread_id).await?;
        Ok(self.forum.page(thread).await?)
    }

    pub async fn reply_school_thread(
        &self,
        session: Option<&Session>,
        thread_id: i64,
        content: &str,
    ) -> Result<Post, SchoolError> {
        let thread = self.member_thread(session, thread_id).await?;
        let session = session.ok_or(SchoolError::Forbidden)?;
        Ok(self.forum.insert_post(session, thread.id, content).await?)
    }

    pub async fn teacher_edit_thread(
        &self,
        teacher: &Session,
        thread_id: i64,
        title: &str,
        content: &str,
    ) -> Result<(), SchoolError> {
        let school = self.teacher_school(teacher).await?;
        let thread = self
            .school_thread_of(school.id, thread_id)
            .await?
            .ok_or(SchoolError::NotFound)?;
        Ok(self.forum.apply_thread_edit(thread.id, title, content).await?)
    }

    /// Returns whether a thread was deleted; foreign ids are ignored.
    pub async fn teacher_delete_thread(
        &self,
        teacher: &Session,
        thread_id: i64,
    ) -> Result<bool, SchoolError> {
        let school = self.teacher_school(teacher).await?;
        match self.school_thread_of(school.id, thread_id).await? {
            Some(thread) => {
                self.forum.remove_thread(thread.id).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn teacher_edit_post(
        &self,
        teacher: &Session,
        post_id: i64,
        content: &str,
    ) -> Result<(), SchoolError> {
        let school = self.teacher_school(teacher).await?;
        let post = self
            .school_post_of(school.id, post_id)
            .await?
            .ok_or(SchoolError::NotFound)?;
        Ok(self.forum.apply_post_edit(post.id, content).await?)
    }

    /// Returns whether a reply was deleted; foreign ids are ignored.
    pub async fn teacher_delete_post(
        &self,
        teacher: &Session,
        post_id: i64,
    ) -> Result<bool, SchoolError> {
        let school = self.teacher_school(teacher).await?;
        match self.school_post_of(school.id, post_id).await? {
            Some(post) => {
                self.forum.remove_post(post.id).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// CSV of every spotted thread of the school, oldest first.
    pub async fn export_csv(
        &self,
        teacher: &Session,
        school_id: i64,
    ) -> Result<CsvExport, SchoolError> {
        if !teacher.is_teacher_of(school_id) {
            return Err(SchoolError::Forbidden);
        }
        let school = self
            .store
            .get_school(school_id)
            .await?
            .ok_or(SchoolError::NotFound)?;

        let mut threads = self.forum.threads(ThreadScope::School(school.id)).await?;
        threads.reverse();

        tracing::info!(school_id, rows = threads.len(), "Spotted export generated");
        Ok(CsvExport {
            filename: export_filename(&school.name, Utc::now()),
            body: threads_to_csv(&threads),
        })
    }

    // ------------------------------------------------------------------------
    // Access helpers
    // ------------------------------------------------------------------------

    async fn teacher_school(&self, session: &Session) -> Result<School, SchoolError> {
        let school_id = match (session.role, session.school_id) {
            (Role::Teacher, Some(id)) => id,
            _ => return Err(SchoolError::Forbidden),
        };
        self.store
            .get_school(school_id)
            .await?
            .ok_or(SchoolError::NotFound)
    }

    async fn member_school(
        &self,
        session: Option<&Session>,
        school_id: i64,
    ) -> Result<School, SchoolError> {
        let school = self
            .store
            .get_school(school_id)
            .await?
            .ok_or(SchoolError::NotFound)?;
        match session {
            Some(s) if s.belongs_to(school.id) => Ok(school),
            _ => Err(SchoolError::Forbidden),
        }
    }

    async fn member_thread(
        &self,
        session: Option<&Session>,
        thread_id: i64,
    ) -> Result<Thread, SchoolError> {
        let thread = self
            .forum
            .get_thread(thread_id)
            .await?
            .ok_or(SchoolError::NotFound)?;
        let school_id = thread.school_id.ok_or(SchoolError::NotFound)?;
        match session {
            Some(s) if s.belongs_to(school_id) => Ok(thread),
            _ => Err(SchoolError::Forbidden),
        }
    }

    async fn student_of(&self, school_id: i64, user_id: i64) -> Result<Option<User>, SchoolError> {
        Ok(self
            .accounts
            .get_user(user_id)
            .await?
            .filter(|u| u.role == Role::Student && u.school_id == Some(school_id)))
    }

    async fn school_thread_of(
        &self,
        school_id: i64,
        thread_id: i64,
    ) -> Result<Option<Thread>, SchoolError> {
        Ok(self
            .forum
            .get_thread(thread_id)
            .await?
            .filter(|t| t.school_id == Some(school_id)))
    }

    async fn school_post_of(
        &self,
        school_id: i64,
        post_id: i64,
    ) -> Result<Option<Post>, SchoolError> {
        let Some(post) = self.forum.get_post(post_id).await? else {
            return Ok(None);
        };
        Ok(self
            .school_thread_of(school_id, post.thread_id)
            .await?
            .map(|_| post))
    }
}

// ============================================================================
// TESTS
// ============================================================================
