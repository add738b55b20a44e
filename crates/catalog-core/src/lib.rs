//! Core domain models and types for Catalog Sync
//!
//! This crate contains the data structures shared by every layer of the
//! catalog synchronization engine: source repositories, the catalog items
//! discovered in them, registry entries, sync outcomes, rate-limit status,
//! change events, and the pure filtering used by list views.

pub mod asset;
pub mod error;
pub mod event;
pub mod filter;
pub mod item;
pub mod rate_limit;
pub mod registry;
pub mod repo;
pub mod sync;
pub mod types;

// Re-exports for convenience
pub use asset::{AssetKind, TypeFilter};
pub use error::{CatalogError, Result};
pub use event::CatalogEvent;
pub use filter::{filter_view, Searchable};
pub use item::CatalogItem;
pub use rate_limit::RateLimitStatus;
pub use registry::{ConnectionSpec, ImportedAsset, RegistryEntry, RegistryPage};
pub use repo::{ContentKind, RepoDescriptor, RepoLayout, SourceRepo};
pub use sync::SyncOutcome;
pub use types::{ItemId, LocalAssetId, RegistryEntryId, RepoId};
