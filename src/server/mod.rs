pub mod archive;
pub mod auth;
pub mod bandwidth;
pub mod handlers;
pub mod routes;
pub mod session;
pub mod state;

pub use auth::{AccessDecision, AccessGuard};
pub use bandwidth::{BandwidthSnapshot, BandwidthTracker};
pub use session::{SessionOptions, SessionState, SessionSummary, ShareMode, ShareSession};
pub use state::{ShareCounters, ShareState};
