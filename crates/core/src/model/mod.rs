mod course;
mod ids;
mod progress;

pub use ids::{CourseId, LessonId, ModuleId, ParseIdError, UserId};

pub use course::{CourseModule, Enrollment, ModuleAvailability};
pub use progress::{LessonProgress, ProgressError};
