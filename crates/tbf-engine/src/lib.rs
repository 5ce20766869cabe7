//! Filter computation for collection pages: parameter classification,
//! product matching, windowed pagination, facet index construction and
//! self-exclusion facet values. All I/O goes through [`ProductSource`] and
//! [`FacetIndexSink`].

pub mod classify;
pub mod collate;
pub mod disabled;
pub mod error;
pub mod facet_index;
pub mod matcher;
pub mod paging;
pub mod scan;
pub mod self_exclusion;
pub mod service;
pub mod source;
pub mod types;
pub mod value;
pub mod window;

pub use classify::{classify_filters, ClassifiedFilters, FilterParam};
pub use disabled::{disabled_filters, DisabledFilter};
pub use error::RebuildError;
pub use facet_index::{build_index, FacetAccumulator, IndexConfig, MetafieldDefinition};
pub use matcher::ProductMatcher;
pub use paging::{parse_paging, parse_sort, Paging};
pub use self_exclusion::{available_values, AvailableValues, FacetTarget};
pub use service::{
    build_collection_index, filter_collection, rebuild_collection_index, rebuild_collections,
    EngineSettings, FilterMode, FilterRequest, FilterResponse,
};
pub use source::{FacetIndexSink, ProductSource};
pub use types::{
    BackorderFlag, LocaleContext, MetafieldRecord, PageInfo, PriceRange, ProductNode, ProductPage,
    ProductQuery, SortKey, SortOrder, VariantNode,
};
pub use value::{explode_value, is_variant_available};
pub use window::{filtered_window, WindowPage};
