use lesson_core::model::UserId;

/// Resolution state reported by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityState {
    /// Auth is still resolving; trackers wait.
    Loading,
    /// Resolved with no signed-in user.
    Anonymous,
    Ready(UserId),
}

impl IdentityState {
    #[must_use]
    pub fn user_id(self) -> Option<UserId> {
        match self {
            IdentityState::Ready(id) => Some(id),
            IdentityState::Loading | IdentityState::Anonymous => None,
        }
    }
}

/// Exposes the current user and whether auth has finished loading.
pub trait IdentityProvider: Send + Sync {
    fn current(&self) -> IdentityState;
}

/// Identity fixed at construction, for the CLI and tests.
#[derive(Debug, Clone, Copy)]
pub struct StaticIdentity(pub IdentityState);

impl IdentityProvider for StaticIdentity {
    fn current(&self) -> IdentityState {
        self.0
    }
}
