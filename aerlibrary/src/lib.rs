//! # aerlibrary - Library Collaborators for AetherRadio
//!
//! `aerlibrary` holds the engine's collaborator interfaces for per-user
//! state: the session source ([`AuthProvider`]) and the liked-tracks client
//! ([`FavoritesClient`]). The engine consumes these; the platform layer
//! decides what backs them.
//!
//! ## Quick Start
//!
//! ```no_run
//! use aerlibrary::{FavoritesClient, StaticAuthProvider};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let auth = Arc::new(StaticAuthProvider::anonymous());
//!     let favorites = FavoritesClient::new("https://library.example/", auth)?;
//!
//!     for track in favorites.list().await? {
//!         println!("{} - {}", track.artist, track.title);
//!     }
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod error;
pub mod favorites;

// Re-exports for convenience
pub use auth::{AuthProvider, Credentials, Session, StaticAuthProvider};
pub use error::{Error, Result};
pub use favorites::{FavoriteTrack, FavoritesClient};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
