//! # aeradmin - Station Admin Sync for AetherRadio
//!
//! `aeradmin` drives the station's administrative library sync. A sync is a
//! single streaming HTTP request whose NDJSON response reports progress line
//! by line; this crate triggers it, filters the noise out of the progress
//! feed, and guarantees at most one sync runs at a time.
//!
//! ## Quick Start
//!
//! ```no_run
//! use aeradmin::{SyncStreamClient, SyncTarget};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = SyncStreamClient::new(
//!         "https://radio.example/",
//!         Some("admin-token".into()),
//!     )?;
//!
//!     for line in client.run(SyncTarget::All).await? {
//!         println!("{line}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod sync;

// Re-exports for convenience
pub use error::{Error, Result};
pub use sync::{SyncStreamClient, SyncTarget};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
