//! Route guards

pub mod role;
pub mod session;

pub use role::{require_admin, require_clinic_admin};
pub use session::{require_active_subscription, require_session, session_token};
