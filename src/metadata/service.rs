//! Metadata reconciliation service

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::merge::merge;
use super::models::{EntityTypeDetail, EntityTypeRecord, HybridMetadata, MetaEntry};
use super::repair::parse_meta_feed;
use crate::client::{ApiClient, PagedCollection};
use crate::config::MetadataConfig;
use crate::entity::{EntityCategory, EntityRegistry, TypeSource};
use crate::{Error, Result};

const PRIMARY_ENDPOINT: &str = "EntityTypes";
const SECONDARY_ENDPOINT: &str = "meta";

/// Reconciles the paged `EntityTypes` catalog, the `meta` feed and the
/// built-in system types into one view of the remote schema.
pub struct MetadataService {
    client: Arc<ApiClient>,
    registry: Arc<EntityRegistry>,
    config: MetadataConfig,
    last: RwLock<Option<Arc<HybridMetadata>>>,
}

impl MetadataService {
    /// Create a service
    #[must_use]
    pub fn new(client: Arc<ApiClient>, registry: Arc<EntityRegistry>, config: MetadataConfig) -> Self {
        Self {
            client,
            registry,
            config,
            last: RwLock::new(None),
        }
    }

    /// Fetch every page of the primary catalog.
    ///
    /// Paging stops on the first page holding fewer than `page_size` items,
    /// or after `max_pages` pages. A missing `Next` link does not end paging.
    ///
    /// # Errors
    ///
    /// Propagates the first request failure.
    pub async fn fetch_primary(&self) -> Result<Vec<EntityTypeRecord>> {
        let page_size = self.config.page_size.max(1);
        let mut records = Vec::new();

        for page in 0..self.config.max_pages {
            let query = [
                ("take", page_size.to_string()),
                ("skip", (page * page_size).to_string()),
            ];
            let collection: PagedCollection<EntityTypeRecord> =
                self.client.get_as(PRIMARY_ENDPOINT, &query).await?;

            let count = collection.items.len();
            let has_next = collection.has_next();
            records.extend(collection.items);
            debug!(page, count, has_next, "Fetched entity type page");

            if count < page_size {
                return Ok(records);
            }
        }

        warn!(
            max_pages = self.config.max_pages,
            fetched = records.len(),
            "Entity type catalog truncated at page cap"
        );
        Ok(records)
    }

    /// Fetch and decode the secondary `meta` feed
    ///
    /// # Errors
    ///
    /// Returns the request failure, or [`Error::MetadataParse`] when the feed
    /// cannot be decoded even after repair.
    pub async fn fetch_secondary(&self) -> Result<Vec<MetaEntry>> {
        let raw = self.client.request_bytes(SECONDARY_ENDPOINT, &[]).await?;
        Ok(parse_meta_feed(&raw)?.into_entries())
    }

    /// Load both remote sources concurrently and merge them with the static
    /// system types. Source failures are recorded as warnings, never returned.
    pub async fn load_hybrid(&self) -> Arc<HybridMetadata> {
        let secondary = async {
            if self.config.use_secondary {
                Some(self.fetch_secondary().await)
            } else {
                None
            }
        };
        let (primary, secondary) = tokio::join!(self.fetch_primary(), secondary);

        let mut warnings = Vec::new();
        let primary = primary.unwrap_or_else(|e| {
            warn!(error = %e, "Primary entity type catalog unavailable");
            warnings.push(format!("primary: {e}"));
            Vec::new()
        });

        let mut secondary_available = false;
        let secondary = match secondary {
            Some(Ok(entries)) => {
                secondary_available = true;
                entries
            }
            Some(Err(e)) => {
                warn!(error = %e, "Secondary metadata feed unusable, skipping");
                warnings.push(format!("secondary: {e}"));
                Vec::new()
            }
            None => Vec::new(),
        };

        let statics: Vec<_> = self
            .registry
            .descriptors()
            .into_iter()
            .filter(|d| d.category == EntityCategory::System)
            .collect();

        let hybrid = Arc::new(HybridMetadata {
            entries: merge(&primary, &secondary, &statics),
            primary_count: primary.len(),
            secondary_count: secondary.len(),
            secondary_available,
            warnings,
        });
        info!(
            types = hybrid.entries.len(),
            primary = hybrid.primary_count,
            secondary = hybrid.secondary_count,
            "Entity type metadata reconciled"
        );

        *self.last.write() = Some(Arc::clone(&hybrid));
        hybrid
    }

    /// Sorted, de-duplicated names across all sources. Always succeeds; with
    /// both remote sources down this is the static system type list.
    pub async fn get_valid_type_names(&self) -> Vec<String> {
        self.load_hybrid().await.names()
    }

    /// Most recently loaded metadata, if any
    #[must_use]
    pub fn hybrid(&self) -> Option<Arc<HybridMetadata>> {
        self.last.read().clone()
    }

    /// Merged detail for one type, loading metadata if nothing is retained yet
    pub async fn entity_detail(&self, name: &str) -> Option<EntityTypeDetail> {
        let hybrid = match self.hybrid() {
            Some(hybrid) => hybrid,
            None => self.load_hybrid().await,
        };
        hybrid.entries.get(name).cloned()
    }
}

#[async_trait]
impl TypeSource for MetadataService {
    async fn fetch_type_names(&self) -> Result<Vec<String>> {
        let hybrid = self.load_hybrid().await;
        if !hybrid.has_remote_data() {
            return Err(Error::Transport(format!(
                "No remote entity type source available ({})",
                hybrid.warnings.join("; ")
            )));
        }
        Ok(hybrid.names())
    }
}

impl std::fmt::Debug for MetadataService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataService")
            .field("config", &self.config)
            .field("loaded", &self.last.read().is_some())
            .finish_non_exhaustive()
    }
}
