//! Certificate issuance on lesson completion.
//!
//! `CertificateTrigger` consumes [`LessonCompleted`] events and asks the
//! completion-check service whether the enclosing course is now finished.
//! A failed check is logged and dropped; the lesson's completion is already
//! persisted and a later completion can retry issuance.

mod http;

use std::sync::Arc;

use async_trait::async_trait;
use lesson_core::model::{LessonId, UserId};
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::CompletionCheckError;
use crate::events::{CompletionReceiver, LessonCompleted};
use crate::notify::Notifier;

pub use http::{CompletionCheckConfig, HttpCompletionCheck};

/// Outcome of a completion check.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct CertificateCheck {
    pub issued: bool,
    #[serde(default)]
    pub code: Option<String>,
}

/// External capability that decides whether a certificate is due.
#[async_trait]
pub trait CompletionCheck: Send + Sync {
    /// # Errors
    ///
    /// Returns `CompletionCheckError` when the service cannot be reached or
    /// answers with an error.
    async fn check(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<CertificateCheck, CompletionCheckError>;
}

/// Check used when no service is configured. Never issues.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCompletionCheck;

#[async_trait]
impl CompletionCheck for NoopCompletionCheck {
    async fn check(
        &self,
        _user_id: UserId,
        _lesson_id: LessonId,
    ) -> Result<CertificateCheck, CompletionCheckError> {
        Ok(CertificateCheck::default())
    }
}

pub const CERTIFICATE_ISSUED_MESSAGE: &str = "Certificate issued";

#[derive(Clone)]
pub struct CertificateTrigger {
    checker: Arc<dyn CompletionCheck>,
    notifier: Arc<dyn Notifier>,
}

impl CertificateTrigger {
    #[must_use]
    pub fn new(checker: Arc<dyn CompletionCheck>, notifier: Arc<dyn Notifier>) -> Self {
        Self { checker, notifier }
    }

    /// Run one check for a completion. Returns the certificate code when one
    /// was issued with a code.
    pub async fn handle(&self, event: &LessonCompleted) -> Option<String> {
        match self.checker.check(event.user_id, event.lesson_id).await {
            Ok(CertificateCheck {
                issued: true,
                code: Some(code),
            }) => {
                info!(
                    user_id = %event.user_id,
                    lesson_id = %event.lesson_id,
                    code = %code,
                    "certificate issued"
                );
                self.notifier
                    .notify_success(CERTIFICATE_ISSUED_MESSAGE, Some(code.as_str()));
                Some(code)
            }
            Ok(CertificateCheck {
                issued: true,
                code: None,
            }) => {
                warn!(
                    user_id = %event.user_id,
                    lesson_id = %event.lesson_id,
                    "certificate issued without a code"
                );
                self.notifier.notify_success(CERTIFICATE_ISSUED_MESSAGE, None);
                None
            }
            Ok(CertificateCheck { issued: false, .. }) => {
                debug!(
                    user_id = %event.user_id,
                    lesson_id = %event.lesson_id,
                    "course not yet complete; no certificate"
                );
                None
            }
            Err(error) => {
                warn!(
                    user_id = %event.user_id,
                    lesson_id = %event.lesson_id,
                    %error,
                    "completion check failed"
                );
                None
            }
        }
    }

    /// Handle events until every sender has been dropped.
    pub async fn run(self, mut events: CompletionReceiver) {
        while let Some(event) = events.recv().await {
            self.handle(&event).await;
        }
        debug!("completion channel closed");
    }

    pub fn spawn(self, events: CompletionReceiver) -> JoinHandle<()> {
        tokio::spawn(self.run(events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lesson_core::time::fixed_now;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedCheck {
        calls: AtomicUsize,
        outcome: fn() -> Result<CertificateCheck, CompletionCheckError>,
    }

    #[async_trait]
    impl CompletionCheck for ScriptedCheck {
        async fn check(
            &self,
            _user_id: UserId,
            _lesson_id: LessonId,
        ) -> Result<CertificateCheck, CompletionCheckError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.outcome)()
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        seen: Mutex<Vec<(String, Option<String>)>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify_success(&self, message: &str, detail: Option<&str>) {
            self.seen
                .lock()
                .unwrap()
                .push((message.to_owned(), detail.map(str::to_owned)));
        }
    }

    fn event() -> LessonCompleted {
        LessonCompleted {
            user_id: UserId::random(),
            lesson_id: LessonId::new(4),
            completed_at: fixed_now(),
        }
    }

    fn build(
        outcome: fn() -> Result<CertificateCheck, CompletionCheckError>,
    ) -> (CertificateTrigger, Arc<ScriptedCheck>, Arc<RecordingNotifier>) {
        let check = Arc::new(ScriptedCheck {
            calls: AtomicUsize::new(0),
            outcome,
        });
        let notifier = Arc::new(RecordingNotifier::default());
        let trigger = CertificateTrigger::new(check.clone(), notifier.clone());
        (trigger, check, notifier)
    }

    #[tokio::test]
    async fn issued_certificate_notifies_once_with_code() {
        let (trigger, check, notifier) = build(|| {
            Ok(CertificateCheck {
                issued: true,
                code: Some("CERT-123".into()),
            })
        });

        let code = trigger.handle(&event()).await;

        assert_eq!(code.as_deref(), Some("CERT-123"));
        assert_eq!(check.calls.load(Ordering::SeqCst), 1);
        let seen = notifier.seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![(
                CERTIFICATE_ISSUED_MESSAGE.to_owned(),
                Some("CERT-123".to_owned())
            )]
        );
    }

    #[tokio::test]
    async fn issued_without_code_notifies_without_detail() {
        let (trigger, _check, notifier) = build(|| {
            Ok(CertificateCheck {
                issued: true,
                code: None,
            })
        });

        assert_eq!(trigger.handle(&event()).await, None);
        let seen = notifier.seen.lock().unwrap();
        assert_eq!(*seen, vec![(CERTIFICATE_ISSUED_MESSAGE.to_owned(), None)]);
    }

    #[tokio::test]
    async fn not_issued_stays_quiet() {
        let (trigger, _check, notifier) = build(|| Ok(CertificateCheck::default()));
        assert_eq!(trigger.handle(&event()).await, None);
        assert!(notifier.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn check_failure_is_swallowed() {
        let (trigger, check, notifier) = build(|| Err(CompletionCheckError::Disabled));
        assert_eq!(trigger.handle(&event()).await, None);
        assert_eq!(check.calls.load(Ordering::SeqCst), 1);
        assert!(notifier.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn run_drains_channel_until_closed() {
        let (trigger, check, _notifier) = build(|| Ok(CertificateCheck::default()));
        let (tx, rx) = crate::events::completion_channel();
        tx.send(event()).unwrap();
        tx.send(event()).unwrap();
        drop(tx);

        trigger.spawn(rx).await.unwrap();
        assert_eq!(check.calls.load(Ordering::SeqCst), 2);
    }
}
