//! Entity-type metadata reconciliation
//!
//! ```text
//!  GET EntityTypes (paged) ──┐
//!                            ├──▶ merge ──▶ HybridMetadata ──▶ TypeSource
//!  GET meta (repaired) ──────┤
//!                            │
//!  static System types ──────┘
//! ```
//!
//! Either remote source may fail independently; the merge always yields at
//! least the static system types.

mod merge;
mod models;
mod repair;
mod service;

pub use merge::merge;
pub use models::{
    EntityTypeDetail, EntityTypeRecord, HybridMetadata, MetaEntry, MetaFeed, MetaProperty,
    MetaRelation, MetadataSource,
};
pub use repair::parse_meta_feed;
pub use service::MetadataService;
