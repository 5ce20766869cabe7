use super::*;

fn storefront_page() -> serde_json::Value {
    json!({
        "collection": {
            "products": {
                "pageInfo": { "hasNextPage": true, "endCursor": "abc" },
                "nodes": [{
                    "id": "gid://shopify/Product/1",
                    "title": "Tee",
                    "handle": "tee",
                    "vendor": "Acme",
                    "priceRange": {
                        "minVariantPrice": { "amount": "10.0" },
                        "maxVariantPrice": { "amount": "12.0" }
                    },
                    "mf_1": { "namespace": "upng", "key": "fit", "type": "single_line_text_field", "value": "slim" },
                    "mf_0": { "namespace": "upng", "key": "color", "type": "list.single_line_text_field", "value": "[\"red\"]" },
                    "mf_2": null,
                    "variants": { "nodes": [{
                        "id": "gid://shopify/ProductVariant/11",
                        "price": { "amount": "10.0" },
                        "quantity": 0,
                        "backorder": { "value": "true" },
                        "mf_0": { "namespace": "upng", "key": "size", "type": "single_line_text_field", "value": "M" }
                    }]}
                }]
            }
        }
    })
}

#[test]
fn storefront_nodes_convert_with_aliases_in_order() {
    let data: CollectionProductsData = serde_json::from_value(storefront_page()).unwrap();
    let page = into_page(data);

    assert!(page.page_info.has_next_page);
    assert_eq!(page.page_info.end_cursor.as_deref(), Some("abc"));
    let product = &page.nodes[0];
    assert_eq!(product.handle, "tee");
    assert_eq!(product.price_range.min.as_deref(), Some("10.0"));
    let keys: Vec<&str> = product.metafields.iter().map(|m| m.key.as_str()).collect();
    assert_eq!(keys, vec!["color", "fit"]);

    let variant = &product.variants[0];
    assert_eq!(variant.price.as_deref(), Some("10.0"));
    assert_eq!(variant.quantity, Some(0));
    assert!(variant.allow_backorder.as_ref().unwrap().is_set());
    assert_eq!(variant.metafields[0].value.as_deref(), Some("M"));
}

#[test]
fn admin_scalar_price_is_accepted() {
    let data: CollectionProductsData = serde_json::from_value(json!({
        "collection": { "products": {
            "pageInfo": { "hasNextPage": false, "endCursor": null },
            "nodes": [{
                "id": "gid://shopify/Product/2",
                "title": "Cap",
                "handle": "cap",
                "vendor": null,
                "priceRange": { "minVariantPrice": { "amount": "8.5" }, "maxVariantPrice": { "amount": "8.5" } },
                "variants": { "nodes": [{
                    "id": "gid://shopify/ProductVariant/21",
                    "price": "8.50",
                    "quantity": 4,
                    "backorder": null
                }]}
            }]
        }}
    }))
    .unwrap();
    let page = into_page(data);

    let variant = &page.nodes[0].variants[0];
    assert_eq!(variant.price.as_deref(), Some("8.50"));
    assert!(variant.allow_backorder.is_none());
    assert!(page.nodes[0].metafields.is_empty());
}

#[test]
fn missing_collection_is_an_empty_last_page() {
    let data: CollectionProductsData = serde_json::from_value(json!({ "collection": null })).unwrap();
    let page = into_page(data);
    assert!(page.nodes.is_empty());
    assert!(!page.page_info.has_next_page);
}
