use tbf_shopify::ShopifyClient;

/// Prints every stored template, following pagination to the end.
///
/// # Errors
///
/// Returns an error on any upstream failure.
pub(crate) async fn run_list_templates(client: &ShopifyClient, first: u32) -> anyhow::Result<()> {
    let mut after: Option<String> = None;
    let mut total = 0usize;
    loop {
        let page = client.list_templates(first, after.as_deref()).await?;
        for template in &page.templates {
            println!(
                "{}\t{}\t{}\t{} collections\t{}",
                template.id,
                if template.active { "active" } else { "inactive" },
                template.title.as_deref().unwrap_or("(untitled)"),
                template.collections.len(),
                template.handle,
            );
        }
        total += page.templates.len();
        match page.page_info.end_cursor {
            Some(cursor) if page.page_info.has_next_page => after = Some(cursor),
            _ => break,
        }
    }
    tracing::debug!(total, "templates listed");
    println!("{total} templates");
    Ok(())
}
