use std::sync::Arc;

use spendwise_auth::{AuthDecision, Capability, SessionVerifier};

/// Session context for a request: the raw token pair plus the verifier.
///
/// Inserted by the session middleware; handlers verify against it before
/// touching any data.
#[derive(Clone)]
pub struct SessionContext {
    verifier: Arc<SessionVerifier>,
    access: Option<String>,
    refresh: Option<String>,
}

impl SessionContext {
    pub fn new(
        verifier: Arc<SessionVerifier>,
        access: Option<String>,
        refresh: Option<String>,
    ) -> Self {
        Self {
            verifier,
            access,
            refresh,
        }
    }

    pub fn verify(&self, capability: &Capability) -> AuthDecision {
        self.verifier
            .verify(self.access.as_deref(), self.refresh.as_deref(), capability)
    }

    pub fn verify_any(&self, capabilities: &[Capability]) -> AuthDecision {
        self.verifier
            .verify_any(self.access.as_deref(), self.refresh.as_deref(), capabilities)
    }
}
