//! Shopify global id (`gid://shopify/<Resource>/<digits>`) helpers.

use crate::templates::UserError;

pub const COLLECTION: &str = "Collection";
pub const METAOBJECT: &str = "Metaobject";
pub const METAFIELD_DEFINITION: &str = "MetafieldDefinition";

/// Returns `true` if `s` is a GID for `resource` with a numeric tail.
#[must_use]
pub fn is_gid(s: &str, resource: &str) -> bool {
    let Some(rest) = s.strip_prefix("gid://shopify/") else {
        return false;
    };
    let Some(tail) = rest.strip_prefix(resource).and_then(|r| r.strip_prefix('/')) else {
        return false;
    };
    !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit())
}

/// Expands a bare numeric collection id into its GID; anything else passes
/// through unchanged.
#[must_use]
pub fn collection_gid(id: &str) -> String {
    if !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) {
        format!("gid://shopify/{COLLECTION}/{id}")
    } else {
        id.to_string()
    }
}

/// Keeps only the ids that are well-formed GIDs for `resource`.
#[must_use]
pub fn retain_gids<'a, I>(ids: I, resource: &str) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    ids.into_iter()
        .filter(|id| is_gid(id, resource))
        .cloned()
        .collect()
}

/// Checks that every id is a GID for `resource`.
///
/// # Errors
///
/// Returns one [`UserError`] per malformed id, with `field` pointing at its
/// position in the input (`["ids", "<index>"]`).
pub fn validate_gids(ids: &[String], resource: &str) -> Result<(), Vec<UserError>> {
    let errors: Vec<UserError> = ids
        .iter()
        .enumerate()
        .filter(|(_, id)| !is_gid(id, resource))
        .map(|(i, id)| UserError {
            field: vec!["ids".to_string(), i.to_string()],
            message: format!("\"{id}\" is not a valid {resource} id"),
            code: Some("INVALID".to_string()),
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
