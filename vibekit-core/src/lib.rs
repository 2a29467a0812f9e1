#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
//! Data-access helper for the ONEsVIBE mobile apps.
//!
//! One process-wide MongoDB connection backs a [`DocumentStore`] offering typed document
//! CRUD, GridFS media storage and user-account helpers. The same API is exported to Swift and
//! Kotlin through `UniFFI`, with documents carried as relaxed Extended JSON.
//!
//! ```ignore
//! use vibekit_core::{connection, DocumentStore};
//!
//! connection::initialize("mongodb://localhost:27017/vibe", None, false).await?;
//! connection::wait_connected(None).await;
//!
//! let store = DocumentStore::new();
//! let posts: Vec<Post> = store.get_posts("posts", "created_at").await?;
//! let id = store.upload_file("/tmp/cover.jpg", "media", None).await?;
//! ```

mod accounts;

mod collections;
pub use collections::*;

pub mod config;
pub use config::StoreConfig;

pub mod connection;

mod error;
pub use error::*;

pub mod logger;

mod media;
pub use media::*;

mod object_id;
pub use object_id::*;

pub mod paths;
pub use paths::MediaPaths;

mod store;
pub use store::*;

uniffi::setup_scaffolding!("vibekit_core");
