use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub const LOGIN_PATH: &str = "/login";

/// Where the user is sent when the session is unrecoverable.
///
/// Redirecting while already on the login route is a no-op, so a burst of failing
/// calls produces a single redirect.
#[derive(Debug, Default)]
pub struct LoginRoute {
    on_login: AtomicBool,
    redirects: AtomicUsize,
}

impl LoginRoute {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send the user to the login route. Returns false if they were already there.
    pub fn redirect(&self) -> bool {
        if self.on_login.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.redirects.fetch_add(1, Ordering::SeqCst);
        tracing::warn!("Session expired, redirecting to {}", LOGIN_PATH);
        true
    }

    /// Leave the login route after a successful login.
    pub fn leave(&self) {
        self.on_login.store(false, Ordering::SeqCst);
    }

    pub fn is_on_login(&self) -> bool {
        self.on_login.load(Ordering::SeqCst)
    }

    pub fn redirect_count(&self) -> usize {
        self.redirects.load(Ordering::SeqCst)
    }
}
