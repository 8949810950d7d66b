//! Request handler module
//!
//! Responsible for request-level concerns shared by every endpoint before
//! dispatching into the face API.

pub mod router;

// Re-export main entry point
pub use router::handle_request;
