//! Query shapes for suggest and search.
//!
//! Suggest is a `bool_prefix` multi-match over the auto-complete field and
//! its shingle sub-fields. Search is a boolean composition:
//!
//! ```text
//! bool
//! ├── must    multi_match(name^3, description^1, category^2, fuzziness AUTO)
//! ├── filter  term(category.raw)          only when a category is given
//! ├── filter  range(price, gte min, lte max)
//! └── should  range(rating, gt 4.0)
//! ```

use serde::{Deserialize, Serialize};
use shelf_core::query::{
    BoolQuery, Fuzziness, MultiMatchQuery, MultiMatchType, RangeQuery, TermQuery,
};
use shelf_core::schema::fields;
use shelf_core::{Error, Highlight, PageRequest, Result, SearchQuery};

/// Most completions returned by suggest.
pub const SUGGEST_SIZE: usize = 5;

/// Score multiplier for `name` matches.
pub const NAME_BOOST: f32 = 3.0;

/// Score multiplier for `description` matches.
pub const DESCRIPTION_BOOST: f32 = 1.0;

/// Score multiplier for `category` matches.
pub const CATEGORY_BOOST: f32 = 2.0;

/// Ratings above this rank higher.
pub const PREFERRED_RATING: f64 = 4.0;

/// Tag inserted before a highlighted span.
pub const HIGHLIGHT_PRE_TAG: &str = "<b>";

/// Tag inserted after a highlighted span.
pub const HIGHLIGHT_POST_TAG: &str = "</b>";

/// Parameters of a product search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    /// Free text matched against name, description and category.
    pub query: String,

    /// Exact category filter; empty means no filter.
    #[serde(default)]
    pub category: String,

    /// Lowest price, inclusive.
    #[serde(default)]
    pub min_price: f64,

    /// Highest price, inclusive.
    #[serde(default = "default_max_price")]
    pub max_price: f64,

    /// 1-based page number.
    #[serde(default = "default_page")]
    pub page: usize,

    /// Page size.
    #[serde(default = "default_size")]
    pub size: usize,
}

fn default_max_price() -> f64 {
    f64::MAX
}

fn default_page() -> usize {
    1
}

fn default_size() -> usize {
    10
}

impl SearchRequest {
    /// Search for `query` in any category and price, first page of 10.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            category: String::new(),
            min_price: 0.0,
            max_price: default_max_price(),
            page: default_page(),
            size: default_size(),
        }
    }

    /// Restrict to one category.
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Restrict to `min..=max`.
    pub fn price_between(mut self, min: f64, max: f64) -> Self {
        self.min_price = min;
        self.max_price = max;
        self
    }

    /// Select a page.
    pub fn page(mut self, page: usize, size: usize) -> Self {
        self.page = page;
        self.size = size;
        self
    }

    /// The offset window for this request.
    ///
    /// # Errors
    ///
    /// Returns a validation error for page 0, size 0, or a NaN price bound.
    pub fn page_request(&self) -> Result<PageRequest> {
        if self.min_price.is_nan() {
            return Err(Error::validation_field("minPrice", "must be a number"));
        }
        if self.max_price.is_nan() {
            return Err(Error::validation_field("maxPrice", "must be a number"));
        }
        PageRequest::of(self.page, self.size)
    }
}

/// Completion query for what the user has typed so far.
pub fn suggest_query(text: &str) -> SearchQuery {
    MultiMatchQuery::new(text)
        .field(fields::NAME_AUTO_COMPLETE)
        .field(fields::NAME_AUTO_COMPLETE_2GRAM)
        .field(fields::NAME_AUTO_COMPLETE_3GRAM)
        .match_type(MultiMatchType::BoolPrefix)
        .into()
}

/// Search query for `request`.
pub fn search_query(request: &SearchRequest) -> SearchQuery {
    let text = MultiMatchQuery::new(request.query.as_str())
        .boosted_field(fields::NAME, NAME_BOOST)
        .boosted_field(fields::DESCRIPTION, DESCRIPTION_BOOST)
        .boosted_field(fields::CATEGORY, CATEGORY_BOOST)
        .fuzziness(Fuzziness::Auto);

    let mut query = BoolQuery::new().must(text);
    if !request.category.is_empty() {
        query = query.filter(TermQuery::new(fields::CATEGORY_RAW, request.category.as_str()));
    }
    query
        .filter(
            RangeQuery::new(fields::PRICE)
                .gte(request.min_price)
                .lte(request.max_price),
        )
        .should(RangeQuery::new(fields::RATING).gt(PREFERRED_RATING))
        .into()
}

/// Highlight request for search results.
pub fn search_highlight() -> Highlight {
    Highlight::new([fields::NAME]).tags(HIGHLIGHT_PRE_TAG, HIGHLIGHT_POST_TAG)
}

// ============================================================================
// Tests
// ============================================================================
