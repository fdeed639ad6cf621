//! Backend Error Module
//!
//! This module defines how request errors are classified, rendered and
//! reported.
//!
//! # Architecture
//!
//! - **`types`** - `DomainError` and the `AppError` dispatch
//! - **`conversion`** - `IntoResponse` implementations
//! - **`sink`** - the reporting middleware and the catch-all route
//!
//! # Module Structure
//!
//! ```text
//! error/
//! ├── mod.rs        - Module exports and documentation
//! ├── types.rs      - Error type definitions
//! ├── conversion.rs - Error to response conversion
//! └── sink.rs       - Error logging and the not-found fallback
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use chatty::backend::error::{AppError, DomainError};
//!
//! async fn handler() -> Result<&'static str, AppError> {
//!     Err(DomainError::bad_request("bad input").into())
//! }
//! ```

/// Error type definitions
pub mod types;

/// Error conversion implementations
pub mod conversion;

/// Error reporting sink
pub mod sink;

// Re-export commonly used types
pub use conversion::ErrorReport;
pub use types::{AppError, DomainError};
