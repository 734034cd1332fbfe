// Per-request authentication state. Pure transitions, no I/O.
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    /// Sent without a bearer token
    Unauthenticated,
    /// Sent (or about to be resent) with a bearer token
    Authenticated,
    /// Got a 401, waiting on the refresh call
    RefreshInFlight,
    /// Refresh failed or was impossible; terminal
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthTransitionError {
    /// The one refresh this request is allowed has been used
    AlreadyRetried,
    InvalidTransition(String),
}

impl fmt::Display for AuthTransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyRetried => write!(f, "Request was already retried after a refresh"),
            Self::InvalidTransition(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for AuthTransitionError {}

/// Tracks one outbound request through the refresh-on-401 path.
///
/// The only legal path is
/// `Unauthenticated | Authenticated -> RefreshInFlight -> Authenticated | Failed`,
/// and it can be walked once per request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestAuth {
    phase: AuthPhase,
    retried: bool,
}

impl RequestAuth {
    pub fn start(has_token: bool) -> Self {
        let phase = if has_token {
            AuthPhase::Authenticated
        } else {
            AuthPhase::Unauthenticated
        };
        Self {
            phase,
            retried: false,
        }
    }

    pub fn phase(&self) -> AuthPhase {
        self.phase
    }

    pub fn retried(&self) -> bool {
        self.retried
    }

    pub fn state_name(&self) -> &'static str {
        match self.phase {
            AuthPhase::Unauthenticated => "Unauthenticated",
            AuthPhase::Authenticated => "Authenticated",
            AuthPhase::RefreshInFlight => "RefreshInFlight",
            AuthPhase::Failed => "Failed",
        }
    }

    /// Transition: 401 received → RefreshInFlight
    pub fn begin_refresh(self) -> Result<Self, AuthTransitionError> {
        if self.retried {
            return Err(AuthTransitionError::AlreadyRetried);
        }
        match self.phase {
            AuthPhase::Unauthenticated | AuthPhase::Authenticated => Ok(Self {
                phase: AuthPhase::RefreshInFlight,
                retried: true,
            }),
            _ => Err(AuthTransitionError::InvalidTransition(format!(
                "Cannot begin refresh from {} state",
                self.state_name()
            ))),
        }
    }

    /// Transition: RefreshInFlight → Authenticated
    pub fn refresh_succeeded(self) -> Result<Self, AuthTransitionError> {
        match self.phase {
            AuthPhase::RefreshInFlight => Ok(Self {
                phase: AuthPhase::Authenticated,
                retried: self.retried,
            }),
            _ => Err(AuthTransitionError::InvalidTransition(format!(
                "Cannot complete refresh from {} state",
                self.state_name()
            ))),
        }
    }

    /// Transition: anything → Failed
    pub fn fail(self) -> Self {
        Self {
            phase: AuthPhase::Failed,
            retried: self.retried,
        }
    }
}
