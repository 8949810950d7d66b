//! HTTP protocol layer module
//!
//! Response builders shared by the request router and the face API,
//! decoupled from the endpoint logic.

pub mod response;

// Re-export commonly used builders
pub use response::{
    apply_common_headers, build_404_response, build_405_response, build_413_response,
    build_error_response, build_health_response, build_html_response, build_json_response,
    build_options_response,
};
