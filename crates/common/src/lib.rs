//! Pubmetric Common Library
//!
//! Shared code for all Pubmetric crates including:
//! - Tool and citation records exchanged between pipeline stages
//! - Error types and handling
//! - Configuration management
//! - The HTTP session used by every upstream client
//! - Metrics
//! - Atomic file persistence

pub mod config;
pub mod errors;
pub mod http;
pub mod metrics;
pub mod models;
pub mod persist;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use http::HttpSession;
pub use models::{CitationEdge, CitationRelation, ToolRecord};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Publication year substituted for tools without one, relative to the
/// current year
pub const MISSING_YEAR_OFFSET: i32 = 100;
