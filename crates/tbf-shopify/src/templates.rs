//! Filter templates stored as app-owned metaobjects.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tbf_core::gid::{is_gid, retain_gids, validate_gids, COLLECTION, METAOBJECT};
use tbf_core::templates::{template_handle, CollectionRef, TEMPLATE_TYPE};
use tbf_core::{FilterTemplate, TemplateAction, TemplateInput, UserError};
use tbf_engine::{rebuild_collections, EngineSettings, PageInfo};

use crate::client::{Api, ShopifyClient};
use crate::error::ShopifyError;
use crate::query;

#[derive(Debug, Deserialize)]
struct WireField {
    key: String,
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireReferences {
    #[serde(default)]
    nodes: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct WireReferenceField {
    references: Option<WireReferences>,
}

#[derive(Debug, Deserialize)]
struct WireMetaobject {
    id: String,
    handle: String,
    #[serde(default)]
    fields: Vec<WireField>,
    #[serde(default)]
    collections: Option<WireReferenceField>,
}

impl From<WireMetaobject> for FilterTemplate {
    fn from(node: WireMetaobject) -> Self {
        let fields: BTreeMap<String, String> = node
            .fields
            .into_iter()
            .filter_map(|f| Some((f.key, f.value?)))
            .collect();
        let collections: Vec<CollectionRef> = node
            .collections
            .and_then(|c| c.references)
            .map(|r| {
                r.nodes
                    .into_iter()
                    .filter_map(|n| serde_json::from_value(n).ok())
                    .collect()
            })
            .unwrap_or_default();
        FilterTemplate::from_fields(node.id, node.handle, &fields, collections)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MutationPayload<T> {
    metaobject: Option<T>,
    #[serde(default)]
    deleted_id: Option<String>,
    #[serde(default)]
    user_errors: Vec<UserError>,
}

/// Fails with the payload's user errors, if any.
fn check_user_errors<T>(
    operation: &str,
    payload: Option<MutationPayload<T>>,
) -> Result<MutationPayload<T>, ShopifyError> {
    let payload = payload.ok_or_else(|| ShopifyError::GraphQl {
        operation: operation.to_owned(),
        messages: vec!["mutation returned no payload".to_owned()],
    })?;
    if payload.user_errors.is_empty() {
        Ok(payload)
    } else {
        Err(ShopifyError::UserErrors {
            operation: operation.to_owned(),
            errors: payload.user_errors,
        })
    }
}

/// `id` and `handle` of a written template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedTemplate {
    pub id: String,
    pub handle: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveOutcome {
    pub template: SavedTemplate,
    /// Collections whose facet index was rebuilt.
    pub rebuilt_collections: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplatePage {
    pub templates: Vec<FilterTemplate>,
    pub page_info: PageInfo,
}

fn template_definition() -> serde_json::Value {
    let field = |key: &str, name: &str, kind: &str| json!({ "key": key, "name": name, "type": kind });
    json!({
        "name": "TB Filters Templates",
        "type": TEMPLATE_TYPE,
        "fieldDefinitions": [
            field("title", "Title", "single_line_text_field"),
            field("collections", "Collections", "list.collection_reference"),
            field("filters", "Filters", "json"),
            field("active", "Active", "boolean"),
            field("include_vendor", "Include vendor", "boolean"),
            field("include_availability", "Include availability", "boolean"),
            field("include_price", "Include price", "boolean"),
            field("filters_order", "Filters order", "json"),
            field("filters_labels", "Filters labels", "json"),
        ],
        "access": { "admin": "MERCHANT_READ_WRITE", "storefront": "NONE" },
    })
}

fn fields_json(fields: &[tbf_core::templates::TemplateField]) -> serde_json::Value {
    json!(fields
        .iter()
        .map(|f| json!({ "key": f.key, "value": f.value }))
        .collect::<Vec<_>>())
}

impl ShopifyClient {
    /// Creates the template metaobject definition. An already existing
    /// definition (`TAKEN`) counts as success.
    ///
    /// # Errors
    ///
    /// Returns [`ShopifyError::UserErrors`] for any other rejection.
    pub async fn ensure_template_definition(&self) -> Result<(), ShopifyError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            metaobject_definition_create: Option<Payload>,
        }
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Payload {
            #[serde(default)]
            user_errors: Vec<UserError>,
        }

        let data: Data = self
            .graphql(
                Api::Admin,
                "CreateTemplateDefinition",
                query::CREATE_TEMPLATE_DEFINITION,
                json!({ "definition": template_definition() }),
            )
            .await?;
        let errors: Vec<UserError> = data
            .metaobject_definition_create
            .map(|p| p.user_errors)
            .unwrap_or_default()
            .into_iter()
            .filter(|e| e.code.as_deref() != Some("TAKEN"))
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ShopifyError::UserErrors {
                operation: "metaobjectDefinitionCreate".to_owned(),
                errors,
            })
        }
    }

    /// Lists templates, newest first.
    ///
    /// # Errors
    ///
    /// Returns transport errors.
    pub async fn list_templates(
        &self,
        first: u32,
        after: Option<&str>,
    ) -> Result<TemplatePage, ShopifyError> {
        #[derive(Deserialize)]
        struct Data {
            metaobjects: Connection,
        }
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Connection {
            #[serde(default)]
            nodes: Vec<WireMetaobject>,
            #[serde(default)]
            page_info: PageInfo,
        }

        let data: Data = self
            .graphql(
                Api::Admin,
                "ListTemplates",
                &query::list_templates(),
                json!({ "first": first.clamp(1, 250), "after": after }),
            )
            .await?;
        Ok(TemplatePage {
            templates: data
                .metaobjects
                .nodes
                .into_iter()
                .map(FilterTemplate::from)
                .collect(),
            page_info: data.metaobjects.page_info,
        })
    }

    /// # Errors
    ///
    /// Returns [`ShopifyError::InvalidId`] for a non-metaobject id, otherwise
    /// transport errors.
    pub async fn get_template(&self, id: &str) -> Result<Option<FilterTemplate>, ShopifyError> {
        #[derive(Deserialize)]
        struct Data {
            metaobject: Option<WireMetaobject>,
        }

        validate_gids(&[id.to_string()], METAOBJECT).map_err(ShopifyError::InvalidId)?;
        let data: Data = self
            .graphql(
                Api::Admin,
                "GetTemplate",
                &query::get_template(),
                json!({ "id": id }),
            )
            .await?;
        Ok(data.metaobject.map(FilterTemplate::from))
    }

    /// Writes a template. A metaobject GID updates that template; anything
    /// else upserts by a handle derived from `id` (the `"0"` sentinel gets
    /// a fresh timestamped handle).
    ///
    /// # Errors
    ///
    /// Returns [`ShopifyError::UserErrors`] with the upstream field errors
    /// verbatim, otherwise transport errors.
    pub async fn save_template(
        &self,
        id: &str,
        input: &TemplateInput,
    ) -> Result<SavedTemplate, ShopifyError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            metaobject_update: Option<MutationPayload<SavedTemplate>>,
            metaobject_upsert: Option<MutationPayload<SavedTemplate>>,
        }

        self.ensure_template_definition().await?;
        let fields = fields_json(&input.to_fields());

        let payload = if is_gid(id, METAOBJECT) {
            let data: Data = self
                .graphql(
                    Api::Admin,
                    "UpdateTemplate",
                    query::UPDATE_TEMPLATE,
                    json!({ "id": id, "metaobject": { "fields": fields } }),
                )
                .await?;
            check_user_errors("metaobjectUpdate", data.metaobject_update)?
        } else {
            let handle = template_handle(id, &input.title, chrono::Utc::now().timestamp_millis());
            let data: Data = self
                .graphql(
                    Api::Admin,
                    "UpsertTemplate",
                    query::UPSERT_TEMPLATE,
                    json!({
                        "handle": { "type": TEMPLATE_TYPE, "handle": handle },
                        "metaobject": { "fields": fields },
                    }),
                )
                .await?;
            check_user_errors("metaobjectUpsert", data.metaobject_upsert)?
        };

        payload.metaobject.ok_or_else(|| ShopifyError::GraphQl {
            operation: "SaveTemplate".to_owned(),
            messages: vec!["no metaobject returned".to_owned()],
        })
    }

    /// Saves a template, then rebuilds and overwrites the facet index of
    /// every collection it lists. Nothing is rebuilt when the save fails.
    ///
    /// # Errors
    ///
    /// Returns the save's errors, definition resolution errors, or
    /// [`ShopifyError::Rebuild`] for the first collection that failed.
    pub async fn save_template_and_rebuild(
        &self,
        id: &str,
        input: &TemplateInput,
        settings: &EngineSettings,
    ) -> Result<SaveOutcome, ShopifyError> {
        let template = self.save_template(id, input).await?;
        let config = self.index_config(input).await?;
        let collections = retain_gids(&input.collection_ids, COLLECTION);
        let admin = self.admin();
        rebuild_collections(&admin, &admin, &collections, &config, settings).await?;
        tracing::info!(
            template_id = %template.id,
            collections = collections.len(),
            "template saved and facet indexes rebuilt"
        );
        Ok(SaveOutcome {
            template,
            rebuilt_collections: collections,
        })
    }

    /// Deletes templates. Every id is validated before anything is sent.
    ///
    /// # Errors
    ///
    /// Returns [`ShopifyError::InvalidId`] listing every bad id,
    /// [`ShopifyError::UserErrors`] for a rejected delete, otherwise
    /// transport errors.
    pub async fn remove_templates(&self, ids: &[String]) -> Result<Vec<String>, ShopifyError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            metaobject_delete: Option<MutationPayload<serde_json::Value>>,
        }

        validate_gids(ids, METAOBJECT).map_err(ShopifyError::InvalidId)?;
        let mut deleted = Vec::with_capacity(ids.len());
        for id in ids {
            let data: Data = self
                .graphql(
                    Api::Admin,
                    "DeleteTemplate",
                    query::DELETE_TEMPLATE,
                    json!({ "id": id }),
                )
                .await?;
            let payload = check_user_errors("metaobjectDelete", data.metaobject_delete)?;
            deleted.push(payload.deleted_id.unwrap_or_else(|| id.clone()));
        }
        Ok(deleted)
    }

    /// Flips the `active` field of templates.
    ///
    /// # Errors
    ///
    /// Same as [`ShopifyClient::remove_templates`].
    pub async fn set_template_status(
        &self,
        ids: &[String],
        active: bool,
    ) -> Result<Vec<String>, ShopifyError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            metaobject_update: Option<MutationPayload<SavedTemplate>>,
        }

        validate_gids(ids, METAOBJECT).map_err(ShopifyError::InvalidId)?;
        let mut updated = Vec::with_capacity(ids.len());
        for id in ids {
            let data: Data = self
                .graphql(
                    Api::Admin,
                    "UpdateTemplate",
                    query::UPDATE_TEMPLATE,
                    json!({
                        "id": id,
                        "metaobject": { "fields": [{ "key": "active", "value": active.to_string() }] },
                    }),
                )
                .await?;
            check_user_errors("metaobjectUpdate", data.metaobject_update)?;
            updated.push(id.clone());
        }
        Ok(updated)
    }

    /// Runs a bulk action over templates.
    ///
    /// # Errors
    ///
    /// See [`ShopifyClient::remove_templates`].
    pub async fn apply_template_action(
        &self,
        ids: &[String],
        action: TemplateAction,
    ) -> Result<Vec<String>, ShopifyError> {
        match action {
            TemplateAction::Remove => self.remove_templates(ids).await,
            TemplateAction::Activate => self.set_template_status(ids, true).await,
            TemplateAction::Deactivate => self.set_template_status(ids, false).await,
        }
    }
}
