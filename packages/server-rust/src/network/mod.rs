//! HTTP surface: configuration, handlers, middleware, server lifecycle, and
//! shutdown control.

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod module;
pub mod shutdown;

pub use config::*;
pub use handlers::{ApiError, AppState, Caller};
pub use module::NetworkModule;
pub use shutdown::*;
