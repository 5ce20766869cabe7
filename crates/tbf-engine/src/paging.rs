use serde::Serialize;

use crate::types::{SortKey, SortOrder};

pub const MAX_PER_PAGE: u32 = 100;
pub const MAX_PAGE: u32 = 999_999;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Paging {
    pub page: u32,
    pub per_page: u32,
    /// Upstream cursor, used by the unfiltered path only.
    pub after: Option<String>,
}

/// Reads `page`, `per_page` and `after` from query pairs. The last
/// occurrence of a key wins.
///
/// `per_page` is clamped to `1..=100` and `page` to `1..=999999`; a value
/// that is present but not a number clamps to the minimum.
pub fn parse_paging<'a, I>(params: I, default_per_page: u32) -> Paging
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut page = None;
    let mut per_page = None;
    let mut after = None;

    for (key, value) in params {
        match key {
            "page" => page = Some(value),
            "per_page" => per_page = Some(value),
            "after" => {
                after = Some(value.trim())
                    .filter(|s| !s.is_empty())
                    .map(str::to_string);
            }
            _ => {}
        }
    }

    Paging {
        page: clamp_param(page, 1, 1, MAX_PAGE),
        per_page: clamp_param(per_page, default_per_page, 1, MAX_PER_PAGE),
        after,
    }
}

fn clamp_param(raw: Option<&str>, default: u32, min: u32, max: u32) -> u32 {
    let value = match raw {
        None => i64::from(default),
        Some(s) => s.trim().parse::<i64>().unwrap_or(i64::from(min)),
    };
    let clamped = value.clamp(i64::from(min), i64::from(max));
    u32::try_from(clamped).unwrap_or(min)
}

/// Maps `sort_by` onto an upstream sort order. Unknown or missing values
/// use the collection's default order.
pub fn parse_sort<'a, I>(params: I) -> SortOrder
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let sort_by = params
        .into_iter()
        .filter(|(k, _)| *k == "sort_by")
        .last()
        .map(|(_, v)| v.trim());

    let (sort_key, reverse) = match sort_by {
        Some("best-selling") => (SortKey::BestSelling, false),
        Some("title-ascending") => (SortKey::Title, false),
        Some("title-descending") => (SortKey::Title, true),
        Some("price-ascending") => (SortKey::Price, false),
        Some("price-descending") => (SortKey::Price, true),
        Some("created-ascending") => (SortKey::Created, false),
        Some("created-descending") => (SortKey::Created, true),
        _ => (SortKey::CollectionDefault, false),
    };
    SortOrder { sort_key, reverse }
}
