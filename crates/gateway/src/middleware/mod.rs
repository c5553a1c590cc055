//! Request middleware and extractors

mod metrics;
mod session;

pub use metrics::track_requests;
pub use session::{clear_cookie, set_cookie, CurrentSession};
