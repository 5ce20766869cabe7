//! `index`: rebuild (or preview) the facet indexes of a template's
//! collections.

use tbf_core::gid::{retain_gids, COLLECTION};
use tbf_engine::{build_collection_index, rebuild_collections, EngineSettings};
use tbf_shopify::ShopifyClient;

/// Rebuilds every collection the template targets. With `dry_run` the
/// computed facets are printed per collection and nothing is written.
///
/// # Errors
///
/// Returns an error if the template does not exist, its definitions cannot
/// be resolved, or any collection fails to rebuild.
pub(crate) async fn run_index(
    client: &ShopifyClient,
    settings: &EngineSettings,
    template_id: &str,
    dry_run: bool,
) -> anyhow::Result<()> {
    let template = client
        .get_template(template_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("template '{template_id}' not found"))?;
    let input = template.to_input();
    let config = client.index_config(&input).await?;
    let collections = retain_gids(&input.collection_ids, COLLECTION);

    if collections.is_empty() {
        println!("template '{template_id}' targets no collections; nothing to do");
        return Ok(());
    }

    let admin = client.admin();
    if dry_run {
        for collection_id in &collections {
            let facets = build_collection_index(&admin, collection_id, &config, settings).await?;
            println!("dry-run: {collection_id} ({} facets)", facets.len());
            println!("{}", serde_json::to_string_pretty(&facets)?);
        }
        return Ok(());
    }

    let rebuilt = rebuild_collections(&admin, &admin, &collections, &config, settings).await?;
    println!("rebuilt facet indexes for {rebuilt} collections of '{template_id}'");
    Ok(())
}
