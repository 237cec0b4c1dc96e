//! Layered configuration: built-in defaults, then an optional TOML file,
//! then `BURP_*` environment variables. Command-line flags are applied on
//! top by the host.
//!
//! ```no_run
//! use burp_core::config::ConfigLoader;
//!
//! let config = ConfigLoader::load_default()?;
//! # Ok::<(), burp_core::config::ConfigError>(())
//! ```

mod error;
mod loader;

pub use error::ConfigError;
pub use error::Result;
pub use loader::AppConfig;
pub use loader::ConfigLoader;
pub use loader::PollConfig;
pub use loader::SegmenterConfig;
pub use loader::ServerConfig;
pub use loader::SessionConfig;
