use crate::identity::IdentityProvider;

/// Shared router state. Holds only process-level collaborators; per-request
/// credential state travels in request extensions, never here.
#[derive(Clone)]
pub struct AppState {
    pub identity: IdentityProvider,
}

impl AppState {
    pub fn new(identity: IdentityProvider) -> Self {
        Self { identity }
    }
}
