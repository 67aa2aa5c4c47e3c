use async_trait::async_trait;
use lesson_core::model::{
    CourseId, CourseModule, Enrollment, LessonId, LessonProgress, UserId,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Per-lesson watch progress, keyed by `(user_id, lesson_id)`.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Fetch the stored progress for a student on a lesson.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend fails or the row cannot be decoded.
    async fn read_progress(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<Option<LessonProgress>, StorageError>;

    /// Write the full record, overwriting any existing row for the same key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn upsert_progress(&self, progress: &LessonProgress) -> Result<(), StorageError>;
}

/// Read side of the enrollment/module directory, plus seeding writes.
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the backend fails.
    async fn get_enrollment(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<Enrollment>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the enrollment cannot be stored.
    async fn upsert_enrollment(&self, enrollment: &Enrollment) -> Result<(), StorageError>;

    /// Modules of a course ordered by position.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend fails.
    async fn list_modules(&self, course_id: CourseId) -> Result<Vec<CourseModule>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the module cannot be stored.
    async fn upsert_module(&self, module: &CourseModule) -> Result<(), StorageError>;
}

/// Per-student boolean flags under fixed keys.
#[async_trait]
pub trait FlagRepository: Send + Sync {
    /// Missing flags read as `false`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend fails.
    async fn get_flag(&self, user_id: UserId, key: &str) -> Result<bool, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the flag cannot be stored.
    async fn set_flag(&self, user_id: UserId, key: &str, value: bool) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    progress: Arc<Mutex<HashMap<(UserId, LessonId), LessonProgress>>>,
    enrollments: Arc<Mutex<HashMap<(UserId, CourseId), Enrollment>>>,
    modules: Arc<Mutex<HashMap<CourseId, Vec<CourseModule>>>>,
    flags: Arc<Mutex<HashMap<(UserId, String), bool>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(err: E) -> StorageError {
    StorageError::Connection(err.to_string())
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn read_progress(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<Option<LessonProgress>, StorageError> {
        let guard = self.progress.lock().map_err(poisoned)?;
        Ok(guard.get(&(user_id, lesson_id)).cloned())
    }

    async fn upsert_progress(&self, progress: &LessonProgress) -> Result<(), StorageError> {
        let mut guard = self.progress.lock().map_err(poisoned)?;
        guard.insert(
            (progress.user_id(), progress.lesson_id()),
            progress.clone(),
        );
        Ok(())
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryRepository {
    async fn get_enrollment(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<Enrollment>, StorageError> {
        let guard = self.enrollments.lock().map_err(poisoned)?;
        Ok(guard.get(&(user_id, course_id)).cloned())
    }

    async fn upsert_enrollment(&self, enrollment: &Enrollment) -> Result<(), StorageError> {
        let mut guard = self.enrollments.lock().map_err(poisoned)?;
        guard.insert((enrollment.user_id, enrollment.course_id), enrollment.clone());
        Ok(())
    }

    async fn list_modules(&self, course_id: CourseId) -> Result<Vec<CourseModule>, StorageError> {
        let guard = self.modules.lock().map_err(poisoned)?;
        let mut modules = guard.get(&course_id).cloned().unwrap_or_default();
        modules.sort_by_key(|m| (m.position, m.id));
        Ok(modules)
    }

    async fn upsert_module(&self, module: &CourseModule) -> Result<(), StorageError> {
        let mut guard = self.modules.lock().map_err(poisoned)?;
        let entry = guard.entry(module.course_id).or_default();
        match entry.iter_mut().find(|m| m.id == module.id) {
            Some(existing) => *existing = module.clone(),
            None => entry.push(module.clone()),
        }
        Ok(())
    }
}

#[async_trait]
impl FlagRepository for InMemoryRepository {
    async fn get_flag(&self, user_id: UserId, key: &str) -> Result<bool, StorageError> {
        let guard = self.flags.lock().map_err(poisoned)?;
        Ok(guard
            .get(&(user_id, key.to_owned()))
            .copied()
            .unwrap_or(false))
    }

    async fn set_flag(&self, user_id: UserId, key: &str, value: bool) -> Result<(), StorageError> {
        let mut guard = self.flags.lock().map_err(poisoned)?;
        guard.insert((user_id, key.to_owned()), value);
        Ok(())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
    pub enrollments: Arc<dyn EnrollmentRepository>,
    pub flags: Arc<dyn FlagRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        let enrollments: Arc<dyn EnrollmentRepository> = Arc::new(repo.clone());
        let flags: Arc<dyn FlagRepository> = Arc::new(repo);
        Self {
            progress,
            enrollments,
            flags,
        }
    }
}
