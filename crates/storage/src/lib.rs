#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    EnrollmentRepository, FlagRepository, InMemoryRepository, ProgressRepository, Storage,
    StorageError,
};
