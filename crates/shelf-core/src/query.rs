//! Backend-agnostic query DSL.
//!
//! Queries are plain values composed from a few primitives: multi-match,
//! term, numeric range, and boolean composition. Search adapters compile
//! them to their native form. The serde shape follows the familiar
//! `{"bool": {"must": [...]}}` layout so a query can be logged verbatim.
//!
//! ```rust
//! use shelf_core::query::{BoolQuery, Fuzziness, MultiMatchQuery, RangeQuery, TermQuery};
//!
//! let query = BoolQuery::new()
//!     .must(
//!         MultiMatchQuery::new("red shoe")
//!             .boosted_field("name", 3.0)
//!             .field("description")
//!             .fuzziness(Fuzziness::Auto),
//!     )
//!     .filter(TermQuery::new("category.raw", "shoes"))
//!     .filter(RangeQuery::new("price").gte(0).lte(100))
//!     .should(RangeQuery::new("rating").gt(4.0));
//! ```

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::product::ProductDocument;

// ============================================================================
// Query tree
// ============================================================================

/// A search query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchQuery {
    /// Score one input against several fields.
    MultiMatch(MultiMatchQuery),
    /// Exact term on an unanalyzed field.
    Term(TermQuery),
    /// Numeric range.
    Range(RangeQuery),
    /// Boolean composition.
    Bool(BoolQuery),
    /// Every document.
    MatchAll {},
}

impl SearchQuery {
    /// Match every document.
    pub fn match_all() -> Self {
        SearchQuery::MatchAll {}
    }

    /// Walk this query and its children, depth first.
    pub fn visit<'a>(&'a self, f: &mut dyn FnMut(&'a SearchQuery)) {
        f(self);
        if let SearchQuery::Bool(b) = self {
            for q in b.must.iter().chain(&b.filter).chain(&b.should) {
                q.visit(f);
            }
        }
    }

    /// Every field path referenced anywhere in the query.
    pub fn referenced_fields(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.visit(&mut |q| match q {
            SearchQuery::MultiMatch(m) => out.extend(m.fields.iter().map(|f| f.field.clone())),
            SearchQuery::Term(t) => out.push(t.field.clone()),
            SearchQuery::Range(r) => out.push(r.field.clone()),
            SearchQuery::Bool(_) | SearchQuery::MatchAll {} => {}
        });
        out
    }

    /// Serialize for diagnostics. Never fails; falls back to `Debug`.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}

impl From<MultiMatchQuery> for SearchQuery {
    fn from(q: MultiMatchQuery) -> Self {
        SearchQuery::MultiMatch(q)
    }
}

impl From<TermQuery> for SearchQuery {
    fn from(q: TermQuery) -> Self {
        SearchQuery::Term(q)
    }
}

impl From<RangeQuery> for SearchQuery {
    fn from(q: RangeQuery) -> Self {
        SearchQuery::Range(q)
    }
}

impl From<BoolQuery> for SearchQuery {
    fn from(q: BoolQuery) -> Self {
        SearchQuery::Bool(q)
    }
}

// ============================================================================
// Multi-match
// ============================================================================

/// How a multi-match combines per-field matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiMatchType {
    /// Any token may match; the best-scoring field wins.
    #[default]
    BestFields,
    /// Every token is a term match except the last, which matches as a
    /// prefix. Scores of all fields add up.
    BoolPrefix,
}

/// Edit-distance tolerance for fuzzy matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fuzziness {
    /// 0 edits up to 2 chars, 1 edit for 3-5 chars, 2 edits from 6 chars.
    Auto,
    /// A fixed number of edits (clamped to 2).
    Edits(u8),
}

impl Fuzziness {
    /// Largest supported edit distance.
    pub const MAX_EDITS: u8 = 2;

    /// Edits allowed for one analyzed token.
    pub fn max_edits(&self, token: &str) -> u8 {
        match self {
            Fuzziness::Auto => match token.chars().count() {
                0..=2 => 0,
                3..=5 => 1,
                _ => 2,
            },
            Fuzziness::Edits(n) => (*n).min(Self::MAX_EDITS),
        }
    }
}

/// A field reference with a score multiplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldBoost {
    /// Field path.
    pub field: String,
    /// Score multiplier.
    pub boost: f32,
}

impl fmt::Display for FieldBoost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if (self.boost - 1.0).abs() < f32::EPSILON {
            write!(f, "{}", self.field)
        } else {
            write!(f, "{}^{}", self.field, self.boost)
        }
    }
}

/// Score one input against several fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiMatchQuery {
    /// Raw user input.
    pub query: String,
    /// Target fields with boosts.
    pub fields: Vec<FieldBoost>,
    /// Combination strategy.
    #[serde(rename = "type", default)]
    pub match_type: MultiMatchType,
    /// Fuzzy tolerance; `None` means exact terms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuzziness: Option<Fuzziness>,
}

impl MultiMatchQuery {
    /// Start a multi-match for `query` with no fields.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            fields: Vec::new(),
            match_type: MultiMatchType::default(),
            fuzziness: None,
        }
    }

    /// Add a field with boost 1.0.
    pub fn field(self, field: impl Into<String>) -> Self {
        self.boosted_field(field, 1.0)
    }

    /// Add a field with an explicit boost.
    pub fn boosted_field(mut self, field: impl Into<String>, boost: f32) -> Self {
        self.fields.push(FieldBoost {
            field: field.into(),
            boost,
        });
        self
    }

    /// Set the combination strategy.
    pub fn match_type(mut self, match_type: MultiMatchType) -> Self {
        self.match_type = match_type;
        self
    }

    /// Enable fuzzy matching.
    pub fn fuzziness(mut self, fuzziness: Fuzziness) -> Self {
        self.fuzziness = Some(fuzziness);
        self
    }

    /// Boost for `field`, if it is targeted.
    pub fn boost_of(&self, field: &str) -> Option<f32> {
        self.fields.iter().find(|f| f.field == field).map(|f| f.boost)
    }
}

// ============================================================================
// Term
// ============================================================================

/// Exact term match on an unanalyzed field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermQuery {
    /// Field path.
    pub field: String,
    /// Literal value.
    pub value: String,
}

impl TermQuery {
    /// Create a term query.
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

// ============================================================================
// Range
// ============================================================================

/// A numeric bound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RangeValue {
    /// Integer bound.
    Integer(i64),
    /// Float bound.
    Double(f64),
}

impl RangeValue {
    /// Value as a float.
    pub fn as_f64(&self) -> f64 {
        match self {
            RangeValue::Integer(v) => *v as f64,
            RangeValue::Double(v) => *v,
        }
    }
}

impl From<i64> for RangeValue {
    fn from(v: i64) -> Self {
        RangeValue::Integer(v)
    }
}

impl From<i32> for RangeValue {
    fn from(v: i32) -> Self {
        RangeValue::Integer(i64::from(v))
    }
}

impl From<f64> for RangeValue {
    fn from(v: f64) -> Self {
        RangeValue::Double(v)
    }
}

/// Numeric range on a single field. Unset bounds are open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeQuery {
    /// Field path.
    pub field: String,
    /// Exclusive lower bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<RangeValue>,
    /// Inclusive lower bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<RangeValue>,
    /// Exclusive upper bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<RangeValue>,
    /// Inclusive upper bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<RangeValue>,
}

impl RangeQuery {
    /// Start an unbounded range on `field`.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            gt: None,
            gte: None,
            lt: None,
            lte: None,
        }
    }

    /// Exclusive lower bound. Replaces any `gte`.
    pub fn gt(mut self, v: impl Into<RangeValue>) -> Self {
        self.gt = Some(v.into());
        self.gte = None;
        self
    }

    /// Inclusive lower bound. Replaces any `gt`.
    pub fn gte(mut self, v: impl Into<RangeValue>) -> Self {
        self.gte = Some(v.into());
        self.gt = None;
        self
    }

    /// Exclusive upper bound. Replaces any `lte`.
    pub fn lt(mut self, v: impl Into<RangeValue>) -> Self {
        self.lt = Some(v.into());
        self.lte = None;
        self
    }

    /// Inclusive upper bound. Replaces any `lt`.
    pub fn lte(mut self, v: impl Into<RangeValue>) -> Self {
        self.lte = Some(v.into());
        self.lt = None;
        self
    }
}

// ============================================================================
// Bool
// ============================================================================

/// Boolean composition of sub-queries.
///
/// `must` clauses constrain membership and score, `filter` clauses only
/// constrain membership, and `should` clauses only contribute score when at
/// least one `must` or `filter` clause is present.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BoolQuery {
    /// Required, scoring.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must: Vec<SearchQuery>,
    /// Required, non-scoring.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filter: Vec<SearchQuery>,
    /// Optional, scoring.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub should: Vec<SearchQuery>,
}

impl BoolQuery {
    /// An empty composition.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `must` clause.
    pub fn must(mut self, q: impl Into<SearchQuery>) -> Self {
        self.must.push(q.into());
        self
    }

    /// Add a `filter` clause.
    pub fn filter(mut self, q: impl Into<SearchQuery>) -> Self {
        self.filter.push(q.into());
        self
    }

    /// Add a `should` clause.
    pub fn should(mut self, q: impl Into<SearchQuery>) -> Self {
        self.should.push(q.into());
        self
    }
}

// ============================================================================
// Paging, highlighting, hits
// ============================================================================

/// Largest `offset + size` a result window may reach.
pub const MAX_RESULT_WINDOW: usize = 10_000;

/// A 0-based window over ranked results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Number of results to skip.
    pub offset: usize,
    /// Maximum number of results.
    pub size: usize,
}

impl PageRequest {
    /// Translate a 1-based page number into an offset window.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `page` or `size` is 0, or if the window
    /// ends past [`MAX_RESULT_WINDOW`].
    pub fn of(page: usize, size: usize) -> Result<Self> {
        if page == 0 {
            return Err(Error::validation_field("page", "pages are numbered from 1"));
        }
        if size == 0 {
            return Err(Error::validation_field("size", "must be greater than 0"));
        }
        let offset = (page - 1)
            .checked_mul(size)
            .ok_or_else(|| Error::validation_field("page", "page window out of range"))?;
        let window = Self { offset, size };
        window.check()?;
        Ok(window)
    }

    /// Reject a window that ends past [`MAX_RESULT_WINDOW`].
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the window.
    pub fn check(&self) -> Result<()> {
        match self.offset.checked_add(self.size) {
            Some(end) if end <= MAX_RESULT_WINDOW => Ok(()),
            _ => Err(Error::validation_field(
                "size",
                format!(
                    "result window offset {} + size {} exceeds {MAX_RESULT_WINDOW}",
                    self.offset, self.size
                ),
            )),
        }
    }

    /// The first `size` results.
    pub fn first(size: usize) -> Self {
        Self { offset: 0, size }
    }
}

/// Highlight request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Highlight {
    /// Fields to produce fragments for.
    pub fields: Vec<String>,
    /// Inserted before each matched span.
    pub pre_tag: String,
    /// Inserted after each matched span.
    pub post_tag: String,
}

impl Highlight {
    /// Highlight `fields` with `<em>` tags.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            pre_tag: "<em>".to_string(),
            post_tag: "</em>".to_string(),
        }
    }

    /// Set the tags wrapped around matched spans.
    pub fn tags(mut self, pre: impl Into<String>, post: impl Into<String>) -> Self {
        self.pre_tag = pre.into();
        self.post_tag = post.into();
        self
    }
}

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    /// Stored document.
    pub document: ProductDocument,
    /// Relevance score, higher is better.
    pub score: f32,
    /// Highlight fragments keyed by field path.
    #[serde(default)]
    pub highlights: HashMap<String, Vec<String>>,
}

impl Hit {
    /// Fragments for `field`, empty if none were produced.
    pub fn highlight_field(&self, field: &str) -> &[String] {
        self.highlights.get(field).map(Vec::as_slice).unwrap_or(&[])
    }
}

// ============================================================================
// Tests
// ============================================================================
