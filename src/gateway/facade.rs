//! Public entry point composing validation, formatting and execution

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use super::search::SearchRequest;
use crate::client::{ApiClient, PagedCollection};
use crate::config::GatewayConfig;
use crate::entity::{
    EntityRegistry, EntityTypeDescriptor, EntityTypeValidator, TypeSource, endpoint_for_type,
    validate_id,
};
use crate::metadata::{EntityTypeDetail, MetadataService};
use crate::query::format_include;
use crate::{Error, Result};

const COMMENTS_ENDPOINT: &str = "Comments";
const ATTACHMENTS_ENDPOINT: &str = "Attachments";

/// Static descriptor and merged remote detail for one entity type
#[derive(Debug, Clone, Serialize)]
pub struct EntityTypeInspection {
    /// Type name
    pub name: String,
    /// Built-in or registered descriptor
    pub descriptor: Option<EntityTypeDescriptor>,
    /// Reconciled remote metadata
    pub detail: Option<EntityTypeDetail>,
}

/// Downloaded attachment
#[derive(Debug, Clone)]
pub struct AttachmentContent {
    /// Attachment id
    pub id: u64,
    /// Original file name, when reported
    pub name: Option<String>,
    /// MIME type, when reported
    pub mime_type: Option<String>,
    /// Raw content
    pub content: Bytes,
}

/// Facade over the remote project-management API.
///
/// Every operation validates its entity type through the cached
/// [`EntityTypeValidator`] before anything reaches the network.
pub struct Gateway {
    client: Arc<ApiClient>,
    registry: Arc<EntityRegistry>,
    metadata: Arc<MetadataService>,
    validator: EntityTypeValidator,
}

impl Gateway {
    /// Build the full stack from configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when no base URL or credential resolves.
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let client = Arc::new(ApiClient::from_config(config)?);
        let registry = Arc::new(EntityRegistry::with_defaults());
        let metadata = Arc::new(MetadataService::new(
            Arc::clone(&client),
            Arc::clone(&registry),
            config.metadata.clone(),
        ));
        let source: Arc<dyn TypeSource> = Arc::clone(&metadata) as Arc<dyn TypeSource>;
        let validator =
            EntityTypeValidator::new(Arc::clone(&registry), source, config.cache.type_ttl);

        info!(base_url = client.base_url(), "Gateway initialized");
        Ok(Self {
            client,
            registry,
            metadata,
            validator,
        })
    }

    /// HTTP client
    #[must_use]
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Entity type registry
    #[must_use]
    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Metadata reconciliation service
    #[must_use]
    pub fn metadata(&self) -> &MetadataService {
        &self.metadata
    }

    /// Entity type validator
    #[must_use]
    pub fn validator(&self) -> &EntityTypeValidator {
        &self.validator
    }

    // ========================================================================
    // Entities
    // ========================================================================

    /// Search a collection, returning the items of one page
    ///
    /// # Errors
    ///
    /// Validation errors for the type or any query part; API errors from the
    /// remote call.
    pub async fn search_entities(&self, request: &SearchRequest) -> Result<Vec<Value>> {
        let entity_type = self.validator.validate_type(&request.entity_type).await?;
        let params = request.query_params()?;
        let endpoint = endpoint_for_type(&entity_type);

        debug!(%endpoint, ?params, "Searching entities");
        let page: PagedCollection<Value> = self.client.get_as(&endpoint, &params).await?;
        Ok(page.items)
    }

    /// Fetch one entity by id
    ///
    /// # Errors
    ///
    /// Validation errors for the type, id or includes; API errors otherwise.
    pub async fn get_entity<S: AsRef<str>>(
        &self,
        entity_type: &str,
        id: u64,
        include: &[S],
    ) -> Result<Value> {
        let entity_type = self.validator.validate_type(entity_type).await?;
        let id = validate_id(&json!(id))?;

        let mut params = Vec::new();
        if let Some(include) = format_include(include)? {
            params.push(("include", include));
        }
        let endpoint = format!("{}/{id}", endpoint_for_type(&entity_type));
        self.client.get(&endpoint, &params).await
    }

    /// Create an entity from a JSON object
    ///
    /// # Errors
    ///
    /// Validation errors for the type or a non-object payload; API errors otherwise.
    pub async fn create_entity(&self, entity_type: &str, data: &Value) -> Result<Value> {
        let entity_type = self.validator.validate_type(entity_type).await?;
        require_object(data)?;

        let created = self.client.post(&endpoint_for_type(&entity_type), data).await?;
        info!(%entity_type, id = ?created.get("Id"), "Entity created");
        Ok(created)
    }

    /// Update an entity; the remote API takes updates as a POST to the item URL
    ///
    /// # Errors
    ///
    /// Validation errors for the type, id or payload; API errors otherwise.
    pub async fn update_entity(&self, entity_type: &str, id: u64, data: &Value) -> Result<Value> {
        let entity_type = self.validator.validate_type(entity_type).await?;
        let id = validate_id(&json!(id))?;
        require_object(data)?;

        let endpoint = format!("{}/{id}", endpoint_for_type(&entity_type));
        let updated = self.client.post(&endpoint, data).await?;
        info!(%entity_type, id, "Entity updated");
        Ok(updated)
    }

    /// Sorted valid entity type names
    pub async fn get_valid_entity_types(&self) -> Vec<String> {
        self.validator.valid_type_names().await
    }

    /// Descriptor and reconciled metadata for one type
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an unknown type.
    pub async fn inspect_entity_type(&self, entity_type: &str) -> Result<EntityTypeInspection> {
        let name = self.validator.validate_type(entity_type).await?;
        Ok(EntityTypeInspection {
            descriptor: self.registry.get(&name),
            detail: self.metadata.entity_detail(&name).await,
            name,
        })
    }

    // ========================================================================
    // Comments
    // ========================================================================

    /// Comments attached to an entity
    ///
    /// # Errors
    ///
    /// Validation error for a zero id; API errors otherwise.
    pub async fn get_comments(&self, entity_id: u64) -> Result<Vec<Value>> {
        let entity_id = validate_id(&json!(entity_id))?;
        let params = [("where", format!("General.Id eq '{entity_id}'"))];
        let page: PagedCollection<Value> = self.client.get_as(COMMENTS_ENDPOINT, &params).await?;
        Ok(page.items)
    }

    /// Add a comment, optionally as a reply to another comment
    ///
    /// # Errors
    ///
    /// Validation error for a zero id or empty text; API errors otherwise.
    pub async fn add_comment(
        &self,
        entity_id: u64,
        text: &str,
        parent_id: Option<u64>,
    ) -> Result<Value> {
        let entity_id = validate_id(&json!(entity_id))?;
        if text.trim().is_empty() {
            return Err(Error::Validation("Comment text must not be empty".to_string()));
        }

        let mut body = json!({
            "General": { "Id": entity_id },
            "Description": text,
        });
        if let Some(parent_id) = parent_id {
            body["ParentId"] = json!(validate_id(&json!(parent_id))?);
        }
        self.client.post(COMMENTS_ENDPOINT, &body).await
    }

    /// Delete a comment
    ///
    /// # Errors
    ///
    /// Validation error for a zero id; API errors otherwise.
    pub async fn delete_comment(&self, comment_id: u64) -> Result<Value> {
        let comment_id = validate_id(&json!(comment_id))?;
        self.client
            .delete(&format!("{COMMENTS_ENDPOINT}/{comment_id}"))
            .await
    }

    // ========================================================================
    // Attachments
    // ========================================================================

    /// Attachment metadata
    ///
    /// # Errors
    ///
    /// Validation error for a zero id; API errors otherwise.
    pub async fn get_attachment(&self, attachment_id: u64) -> Result<Value> {
        let attachment_id = validate_id(&json!(attachment_id))?;
        self.client
            .get(&format!("{ATTACHMENTS_ENDPOINT}/{attachment_id}"), &[])
            .await
    }

    /// Download attachment content from its `Uri`, or the content endpoint
    /// when the metadata carries none
    ///
    /// # Errors
    ///
    /// Validation error for a zero id; API errors otherwise.
    pub async fn download_attachment(&self, attachment_id: u64) -> Result<AttachmentContent> {
        let info = self.get_attachment(attachment_id).await?;
        let text = |key: &str| info.get(key).and_then(Value::as_str).map(str::to_string);

        let endpoint = text("Uri")
            .filter(|uri| !uri.trim().is_empty())
            .unwrap_or_else(|| format!("{ATTACHMENTS_ENDPOINT}/{attachment_id}/Content"));
        let content = self.client.request_bytes(&endpoint, &[]).await?;
        debug!(attachment_id, bytes = content.len(), "Attachment downloaded");

        Ok(AttachmentContent {
            id: attachment_id,
            name: text("Name"),
            mime_type: text("MimeType"),
            content,
        })
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("client", &self.client)
            .field("validator", &self.validator)
            .finish_non_exhaustive()
    }
}

fn require_object(data: &Value) -> Result<()> {
    if data.is_object() {
        Ok(())
    } else {
        Err(Error::Validation("Entity data must be a JSON object".to_string()))
    }
}
