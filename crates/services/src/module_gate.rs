use std::sync::Arc;

use lesson_core::model::{CourseId, CourseModule, ModuleAvailability, ModuleId, UserId};
use lesson_core::{Clock, DripScheduler};
use storage::{EnrollmentRepository, FlagRepository};
use tracing::warn;

use crate::error::ModuleGateError;
use crate::playback::UNLOCK_FLAG_KEY;

/// A module paired with its current availability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleStatus {
    pub module: CourseModule,
    pub availability: ModuleAvailability,
}

/// Builds the module listing for a student: drip gates plus the unlock
/// override.
#[derive(Clone)]
pub struct ModuleGateService {
    clock: Clock,
    enrollments: Arc<dyn EnrollmentRepository>,
    flags: Arc<dyn FlagRepository>,
}

impl ModuleGateService {
    #[must_use]
    pub fn new(
        clock: Clock,
        enrollments: Arc<dyn EnrollmentRepository>,
        flags: Arc<dyn FlagRepository>,
    ) -> Self {
        Self {
            clock,
            enrollments,
            flags,
        }
    }

    /// Availability of every module in the course, in listing order.
    ///
    /// A student without an enrollment record sees drip modules as pending.
    ///
    /// # Errors
    ///
    /// Returns `ModuleGateError::Storage` if enrollment or modules cannot be read.
    pub async fn module_statuses(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Vec<ModuleStatus>, ModuleGateError> {
        let modules = self.enrollments.list_modules(course_id).await?;
        let enrolled_at = self
            .enrollments
            .get_enrollment(user_id, course_id)
            .await?
            .and_then(|enrollment| enrollment.enrolled_at);
        let unlocked = self.is_unlocked(user_id).await;
        let now = self.clock.now();

        let mut gates = DripScheduler::statuses(enrolled_at, &modules, now);
        Ok(modules
            .into_iter()
            .map(|module| {
                let availability = if unlocked {
                    ModuleAvailability::available(None)
                } else {
                    gates.remove(&module.id).unwrap_or_else(|| {
                        DripScheduler::status(enrolled_at, module.drip_offset_days, now)
                    })
                };
                ModuleStatus {
                    module,
                    availability,
                }
            })
            .collect())
    }

    /// Whether a single module is open to the student right now.
    ///
    /// # Errors
    ///
    /// Returns `ModuleGateError::Storage` if enrollment or modules cannot be read.
    pub async fn is_module_available(
        &self,
        user_id: UserId,
        course_id: CourseId,
        module_id: ModuleId,
    ) -> Result<bool, ModuleGateError> {
        Ok(self
            .module_statuses(user_id, course_id)
            .await?
            .iter()
            .any(|status| status.module.id == module_id && status.availability.is_available))
    }

    async fn is_unlocked(&self, user_id: UserId) -> bool {
        match self.flags.get_flag(user_id, UNLOCK_FLAG_KEY).await {
            Ok(value) => value,
            Err(error) => {
                warn!(%user_id, %error, "failed to read unlock flag; treating as locked");
                false
            }
        }
    }
}
