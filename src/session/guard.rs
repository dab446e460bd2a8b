//! Setup guard: at most one provisioning run per signer identity.

use serde::Serialize;

use crate::resolver::SignerIdentity;

/// Provisioning lifecycle for the current signer identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SetupState {
    #[default]
    Idle,
    InProgress,
    Done,
}

impl SetupState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }
}

impl std::fmt::Display for SetupState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Monotonic token identifying one provisioning attempt. Results carrying a
/// stale generation are discarded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Generation(u64);

impl Generation {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Outcome of [`SetupGuard::begin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Begin {
    /// The caller owns this attempt. `superseded` is set when a different
    /// identity's state was dropped to start it.
    Started {
        generation: Generation,
        superseded: bool,
    },
    AlreadyInProgress,
    AlreadyDone,
}

#[derive(Debug, Default)]
pub struct SetupGuard {
    state: SetupState,
    generation: Generation,
    identity: Option<SignerIdentity>,
}

impl SetupGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SetupState {
        self.state
    }

    pub fn identity(&self) -> Option<&SignerIdentity> {
        self.identity.as_ref()
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Claim provisioning for `identity`. Idle → InProgress is the only
    /// transition that starts work; a different identity resets first.
    pub fn begin(&mut self, identity: &SignerIdentity) -> Begin {
        let superseded = match &self.identity {
            Some(current) if current != identity => {
                self.reset();
                true
            }
            _ => false,
        };

        match self.state {
            SetupState::InProgress => Begin::AlreadyInProgress,
            SetupState::Done => Begin::AlreadyDone,
            SetupState::Idle => {
                self.generation = Generation(self.generation.0 + 1);
                self.state = SetupState::InProgress;
                self.identity = Some(identity.clone());
                Begin::Started {
                    generation: self.generation,
                    superseded,
                }
            }
        }
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.state == SetupState::InProgress && self.generation == generation
    }

    /// InProgress → Done. Returns false for a stale generation.
    pub fn complete(&mut self, generation: Generation) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.state = SetupState::Done;
        true
    }

    /// InProgress → Idle so a later evaluation can retry.
    pub fn fail(&mut self, generation: Generation) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.state = SetupState::Idle;
        true
    }

    /// Any → Idle. Bumps the generation so in-flight results are ignored.
    pub fn reset(&mut self) {
        self.state = SetupState::Idle;
        self.identity = None;
        self.generation = Generation(self.generation.0 + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::AuthBackend;

    fn identity(backend: AuthBackend, address: &str) -> SignerIdentity {
        SignerIdentity {
            backend,
            address: address.to_string(),
        }
    }

    fn started(begin: Begin) -> Generation {
        match begin {
            Begin::Started { generation, .. } => generation,
            other => panic!("expected start, got {other:?}"),
        }
    }

    #[test]
    fn only_first_begin_starts_work() {
        let id = identity(AuthBackend::External, "0xaa");
        let mut guard = SetupGuard::new();

        let generation = started(guard.begin(&id));
        assert_eq!(guard.state(), SetupState::InProgress);
        assert_eq!(guard.begin(&id), Begin::AlreadyInProgress);

        assert!(guard.complete(generation));
        assert_eq!(guard.state(), SetupState::Done);
        assert_eq!(guard.begin(&id), Begin::AlreadyDone);
    }

    #[test]
    fn failure_returns_to_idle_for_retry() {
        let id = identity(AuthBackend::Embedded, "0xbb");
        let mut guard = SetupGuard::new();

        let first = started(guard.begin(&id));
        assert!(guard.fail(first));
        assert_eq!(guard.state(), SetupState::Idle);

        let second = started(guard.begin(&id));
        assert!(second > first);
    }

    #[test]
    fn reset_discards_in_flight_generation() {
        let id = identity(AuthBackend::Embedded, "0xbb");
        let mut guard = SetupGuard::new();

        let generation = started(guard.begin(&id));
        guard.reset();
        assert!(!guard.complete(generation));
        assert!(!guard.fail(generation));
        assert_eq!(guard.state(), SetupState::Idle);
        assert!(guard.identity().is_none());
    }

    #[test]
    fn new_identity_supersedes_current() {
        let mut guard = SetupGuard::new();
        let first = started(guard.begin(&identity(AuthBackend::External, "0xaa")));
        assert!(guard.complete(first));

        match guard.begin(&identity(AuthBackend::Embedded, "0xbb")) {
            Begin::Started {
                generation,
                superseded,
            } => {
                assert!(superseded);
                assert!(generation > first);
            }
            other => panic!("expected start, got {other:?}"),
        }
        assert_eq!(
            guard.identity().map(|id| id.backend),
            Some(AuthBackend::Embedded)
        );
    }
}
