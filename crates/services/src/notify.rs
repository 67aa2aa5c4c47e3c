/// User-visible, fire-and-forget notifications.
pub trait Notifier: Send + Sync {
    /// `detail` is an optional second line, such as a certificate code.
    fn notify_success(&self, message: &str, detail: Option<&str>);
}

/// Writes notifications to the tracing pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify_success(&self, message: &str, detail: Option<&str>) {
        match detail {
            Some(detail) => tracing::info!(detail, "{message}"),
            None => tracing::info!("{message}"),
        }
    }
}
