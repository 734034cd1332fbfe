pub mod route;
pub mod session;
pub mod state;

pub use route::LoginRoute;
pub use session::{FileTokenStore, MemoryTokenStore, SessionContext, TokenStore, Tokens};
pub use state::{AuthPhase, AuthTransitionError, RequestAuth};
