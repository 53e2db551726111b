//! Auth session state and the calls that change it.

pub mod models;
mod service;
mod session;

pub use models::{AuthSession, User, UserPatch};
pub use service::AuthApi;
pub use session::SessionStore;
