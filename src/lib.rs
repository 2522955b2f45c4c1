// Courier - A fluent HTTP client for Rust
//
// This library wraps a single shared transport with process-wide default
// settings, per-request overrides and lifecycle hooks.

// Re-export the client
pub use courier_http_client::*;

// Prelude for common imports
pub mod prelude {
    pub use courier_http_client::prelude::*;
}
