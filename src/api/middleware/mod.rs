//! HTTP middleware.
//!
//! Execution order (outermost → innermost):
//! 1. Correlation id: accept or mint `x-request-id`, echo it on the response
//! 2. Request log: method, path, status and latency per request
//! 3. Internal detail: development builds see the cause of a 500

pub mod correlation;
pub mod internal_detail;
pub mod request_log;

pub use correlation::RequestId;
