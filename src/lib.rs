//! Shared JSON document store served over HTTP, with an offline-capable
//! sync client.
//!
//! One JSON document lives in one file. The [`http`] module serves it on a
//! single route (GET reads, POST replaces the whole document, PUT swaps one
//! top-level section) and the [`SyncClient`] consumes it remotely, falling
//! back to a [`LocalCache`] whenever the endpoint is unreachable.
//!
//! ```rust,no_run
//! use doc_sync::{LocalCache, SyncClient};
//!
//! # async fn demo() -> doc_sync::Result<()> {
//! let client = SyncClient::builder("http://127.0.0.1:8080/")
//!     .cache(LocalCache::open("fallback.json")?)
//!     .build()?;
//! let doc = client.load().await?;
//! println!("last modified: {:?}", doc.last_modified);
//! # Ok(())
//! # }
//! ```
//!
//! **Last writer wins.** Nothing locks the backing file: concurrent writers
//! race and the most recent completed write replaces the document
//! wholesale. That is the whole contract. Use a real database if you need
//! more.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod client;
pub mod document;
pub mod error;
pub mod http;
pub mod persist;
pub mod serializer;
pub mod store;

pub use cache::LocalCache;
pub use client::{ConnectionStatus, SyncClient, SyncClientBuilder, SyncClientHandle};
pub use document::{Ack, Document, SectionPatch};
pub use error::{Error, Result};
pub use store::{DocStore, DocStoreBuilder};
