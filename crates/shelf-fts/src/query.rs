//! Compilation of the query DSL to Tantivy queries.
//!
//! | DSL | Tantivy |
//! |-----|---------|
//! | `multi_match` (`best_fields`) | `DisjunctionMaxQuery` over per-field token unions |
//! | `multi_match` (`bool_prefix`) | sum of per-field unions; last token is a prefix |
//! | `term` | `TermQuery` (text) or a single-point `RangeQuery` (numeric) scoring 1.0 |
//! | `range` | `RangeQuery` with the given bounds, scoring 1.0 |
//! | `bool` | `BooleanQuery`; filters wrapped in a zero-score `ConstScoreQuery` |
//! | `match_all` | `AllQuery` |
//!
//! Each text token matches exactly (BM25). With fuzziness it may also match
//! within its allowed edit distance, at a constant score. While compiling,
//! the terms each field can match are collected so the highlighter can find
//! the same spans in stored text.

use std::collections::HashMap;
use std::ops::Bound;

use shelf_core::query::{
    BoolQuery, Fuzziness, MultiMatchQuery, MultiMatchType, RangeQuery, RangeValue, TermQuery,
};
use shelf_core::schema::{IndexedKind, shingles};
use shelf_core::{Error, Result, SearchQuery};
use tantivy::Term;
use tantivy::query::{
    AllQuery, BooleanQuery, BoostQuery, ConstScoreQuery, DisjunctionMaxQuery, EmptyQuery,
    FuzzyTermQuery, Occur, Query, RangeQuery as TantivyRangeQuery, TermQuery as TantivyTermQuery,
};
use tantivy::schema::{Field, IndexRecordOption};
use tantivy::tokenizer::TokenizerManager;

use crate::schema::{MappedField, TantivyMapping};
use crate::settings::analyze_terms;

// ============================================================================
// Highlight terms
// ============================================================================

/// How a query term matches an analyzed token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermMatcher {
    /// Within `distance` edits (0 means exact).
    Fuzzy {
        /// Analyzed query token.
        text: String,
        /// Allowed edits.
        distance: u8,
    },
    /// Token starts with the text.
    Prefix(String),
}

impl TermMatcher {
    /// Whether an analyzed `token` matches.
    pub fn matches(&self, token: &str) -> bool {
        match self {
            TermMatcher::Fuzzy { text, distance } => {
                token == text
                    || (*distance > 0
                        && strsim::osa_distance(token, text) <= usize::from(*distance))
            }
            TermMatcher::Prefix(prefix) => token.starts_with(prefix.as_str()),
        }
    }
}

/// Terms the query can match, by field path.
#[derive(Debug, Clone, Default)]
pub struct HighlightTerms {
    by_field: HashMap<String, Vec<TermMatcher>>,
}

impl HighlightTerms {
    /// Matchers recorded for `path`.
    pub fn for_field(&self, path: &str) -> &[TermMatcher] {
        self.by_field.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    fn push(&mut self, path: &str, matcher: TermMatcher) {
        let matchers = self.by_field.entry(path.to_string()).or_default();
        if !matchers.contains(&matcher) {
            matchers.push(matcher);
        }
    }
}

// ============================================================================
// Compiler
// ============================================================================

/// A compiled query and the terms it highlights.
pub struct CompiledQuery {
    /// Executable query.
    pub query: Box<dyn Query>,
    /// Terms for the highlighter.
    pub highlight_terms: HighlightTerms,
}

impl std::fmt::Debug for CompiledQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledQuery")
            .field("query", &self.query)
            .field("highlight_terms", &self.highlight_terms)
            .finish()
    }
}

/// Compiles [`SearchQuery`] values against one index mapping.
pub struct QueryCompiler<'a> {
    mapping: &'a TantivyMapping,
    tokenizers: &'a TokenizerManager,
    highlight_terms: HighlightTerms,
}

impl<'a> QueryCompiler<'a> {
    /// Create a compiler for `mapping`, analyzing with `tokenizers`.
    pub fn new(mapping: &'a TantivyMapping, tokenizers: &'a TokenizerManager) -> Self {
        Self {
            mapping,
            tokenizers,
            highlight_terms: HighlightTerms::default(),
        }
    }

    /// Compile `query`.
    ///
    /// # Errors
    ///
    /// Returns a query execution error if the query names an unknown field
    /// or applies an operation the field's kind does not support.
    pub fn compile(mut self, query: &SearchQuery) -> Result<CompiledQuery> {
        let query = self.compile_node(query)?;
        Ok(CompiledQuery {
            query,
            highlight_terms: self.highlight_terms,
        })
    }

    fn compile_node(&mut self, query: &SearchQuery) -> Result<Box<dyn Query>> {
        match query {
            SearchQuery::MultiMatch(q) => self.multi_match(q),
            SearchQuery::Term(q) => self.term(q),
            SearchQuery::Range(q) => self.range(q),
            SearchQuery::Bool(q) => self.boolean(q),
            SearchQuery::MatchAll {} => Ok(Box::new(AllQuery)),
        }
    }

    // ------------------------------------------------------------------------
    // bool
    // ------------------------------------------------------------------------

    fn boolean(&mut self, q: &BoolQuery) -> Result<Box<dyn Query>> {
        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for must in &q.must {
            clauses.push((Occur::Must, self.compile_node(must)?));
        }
        for filter in &q.filter {
            let inner = self.compile_node(filter)?;
            clauses.push((Occur::Must, Box::new(ConstScoreQuery::new(inner, 0.0))));
        }
        for should in &q.should {
            clauses.push((Occur::Should, self.compile_node(should)?));
        }

        if clauses.is_empty() {
            return Ok(Box::new(AllQuery));
        }
        Ok(Box::new(BooleanQuery::new(clauses)))
    }

    // ------------------------------------------------------------------------
    // multi_match
    // ------------------------------------------------------------------------

    fn multi_match(&mut self, q: &MultiMatchQuery) -> Result<Box<dyn Query>> {
        let mut per_field = Vec::with_capacity(q.fields.len());

        for target in &q.fields {
            let mapped = self.mapping.require(&target.field)?;
            let clause = match &mapped.indexed.kind {
                IndexedKind::Text { analyzer } => {
                    let tokens = self.analyze(analyzer, &q.query)?;
                    self.token_clause(mapped, &tokens, q.match_type, q.fuzziness)
                }
                IndexedKind::Shingle { analyzer, size } => {
                    let tokens = self.analyze(analyzer, &q.query)?;
                    let shingles = shingles(&tokens, *size);
                    self.token_clause(mapped, &shingles, q.match_type, None)
                }
                IndexedKind::Keyword => {
                    let value = [q.query.clone()];
                    self.token_clause(mapped, &value, MultiMatchType::BestFields, None)
                }
                IndexedKind::Integer | IndexedKind::Double => {
                    return Err(Error::query(format!(
                        "multi_match cannot target numeric field '{}'",
                        target.field
                    )));
                }
            };
            if let Some(clause) = clause {
                per_field.push(boosted(clause, target.boost));
            }
        }

        if per_field.is_empty() {
            return Ok(Box::new(EmptyQuery));
        }
        Ok(match q.match_type {
            MultiMatchType::BestFields => Box::new(DisjunctionMaxQuery::new(per_field)),
            MultiMatchType::BoolPrefix => Box::new(BooleanQuery::union(per_field)),
        })
    }

    /// Union of one clause per token, or `None` if there are no tokens.
    fn token_clause(
        &mut self,
        mapped: &MappedField,
        tokens: &[String],
        match_type: MultiMatchType,
        fuzziness: Option<Fuzziness>,
    ) -> Option<Box<dyn Query>> {
        let last = tokens.len().checked_sub(1)?;
        let path = mapped.indexed.path.as_str();
        let highlightable = !matches!(mapped.indexed.kind, IndexedKind::Shingle { .. });

        let mut clauses = Vec::with_capacity(tokens.len());
        for (i, token) in tokens.iter().enumerate() {
            let term = Term::from_field_text(mapped.field, token);

            if match_type == MultiMatchType::BoolPrefix && i == last {
                clauses.push(Box::new(FuzzyTermQuery::new_prefix(term, 0, true)) as Box<dyn Query>);
                if highlightable {
                    self.highlight_terms
                        .push(path, TermMatcher::Prefix(token.clone()));
                }
                continue;
            }

            let distance = fuzziness.map_or(0, |f| f.max_edits(token));
            let exact: Box<dyn Query> =
                Box::new(TantivyTermQuery::new(term.clone(), IndexRecordOption::WithFreqs));
            if distance == 0 {
                clauses.push(exact);
            } else {
                let fuzzy: Box<dyn Query> = Box::new(FuzzyTermQuery::new(term, distance, true));
                clauses.push(Box::new(BooleanQuery::union(vec![exact, fuzzy])));
            }
            if highlightable {
                self.highlight_terms.push(
                    path,
                    TermMatcher::Fuzzy {
                        text: token.clone(),
                        distance,
                    },
                );
            }
        }

        Some(if clauses.len() == 1 {
            clauses.remove(0)
        } else {
            Box::new(BooleanQuery::union(clauses))
        })
    }

    fn analyze(&self, analyzer: &str, text: &str) -> Result<Vec<String>> {
        let mut analyzer = self
            .tokenizers
            .get(analyzer)
            .ok_or_else(|| Error::query(format!("Analyzer '{analyzer}' is not registered")))?;
        Ok(analyze_terms(&mut analyzer, text))
    }

    // ------------------------------------------------------------------------
    // term
    // ------------------------------------------------------------------------

    fn term(&mut self, q: &TermQuery) -> Result<Box<dyn Query>> {
        let mapped = self.mapping.require(&q.field)?;
        let field = mapped.field;

        match &mapped.indexed.kind {
            IndexedKind::Keyword | IndexedKind::Text { .. } | IndexedKind::Shingle { .. } => {
                if !matches!(mapped.indexed.kind, IndexedKind::Shingle { .. }) {
                    self.highlight_terms.push(
                        &q.field,
                        TermMatcher::Fuzzy {
                            text: q.value.clone(),
                            distance: 0,
                        },
                    );
                }
                let term = Term::from_field_text(field, &q.value);
                Ok(Box::new(TantivyTermQuery::new(term, IndexRecordOption::Basic)))
            }
            IndexedKind::Integer => {
                let value: i64 = q.value.parse().map_err(|_| bad_number(q))?;
                Ok(constant_score(i64_range(field, value, value)))
            }
            IndexedKind::Double => {
                let value: f64 = q.value.parse().map_err(|_| bad_number(q))?;
                Ok(constant_score(f64_range(
                    field,
                    Bound::Included(value),
                    Bound::Included(value),
                )))
            }
        }
    }

    // ------------------------------------------------------------------------
    // range
    // ------------------------------------------------------------------------

    fn range(&mut self, q: &RangeQuery) -> Result<Box<dyn Query>> {
        let mapped = self.mapping.require(&q.field)?;
        let query = match mapped.indexed.kind {
            IndexedKind::Integer => match integer_bounds(q) {
                Some((lower, upper)) => i64_range(mapped.field, lower, upper),
                None => return Ok(Box::new(EmptyQuery)),
            },
            IndexedKind::Double => {
                let lower = match (q.gt, q.gte) {
                    (Some(v), _) => Bound::Excluded(v.as_f64()),
                    (None, Some(v)) => Bound::Included(v.as_f64()),
                    (None, None) => Bound::Included(f64::MIN),
                };
                let upper = match (q.lt, q.lte) {
                    (Some(v), _) => Bound::Excluded(v.as_f64()),
                    (None, Some(v)) => Bound::Included(v.as_f64()),
                    (None, None) => Bound::Included(f64::MAX),
                };
                f64_range(mapped.field, lower, upper)
            }
            _ => {
                return Err(Error::query(format!(
                    "range cannot target non-numeric field '{}'",
                    q.field
                )));
            }
        };
        Ok(constant_score(query))
    }
}

/// Every match of `query` scores 1.0.
fn constant_score(query: Box<dyn Query>) -> Box<dyn Query> {
    Box::new(ConstScoreQuery::new(query, 1.0))
}

fn boosted(query: Box<dyn Query>, boost: f32) -> Box<dyn Query> {
    if (boost - 1.0).abs() < f32::EPSILON {
        query
    } else {
        Box::new(BoostQuery::new(query, boost))
    }
}

fn bad_number(q: &TermQuery) -> Error {
    Error::query(format!(
        "'{}' is not a valid value for numeric field '{}'",
        q.value, q.field
    ))
}

/// Inclusive integer bounds of `q`, or `None` if the range is empty.
///
/// Float bounds are rounded inward, so `gt(4.0)` on an integer field starts
/// at 5 and `lte(9.5)` ends at 9.
fn integer_bounds(q: &RangeQuery) -> Option<(i64, i64)> {
    let bounds = [q.gt, q.gte, q.lt, q.lte];
    if bounds
        .iter()
        .flatten()
        .any(|b| matches!(b, RangeValue::Double(x) if x.is_nan()))
    {
        return None;
    }

    let lower = match (q.gt, q.gte) {
        (Some(RangeValue::Integer(n)), _) => n.checked_add(1)?,
        (Some(RangeValue::Double(x)), _) => (x.floor() as i64).checked_add(1)?,
        (None, Some(RangeValue::Integer(n))) => n,
        (None, Some(RangeValue::Double(x))) => x.ceil() as i64,
        (None, None) => i64::MIN,
    };
    let upper = match (q.lt, q.lte) {
        (Some(RangeValue::Integer(n)), _) => n.checked_sub(1)?,
        (Some(RangeValue::Double(x)), _) => (x.ceil() as i64).checked_sub(1)?,
        (None, Some(RangeValue::Integer(n))) => n,
        (None, Some(RangeValue::Double(x))) => x.floor() as i64,
        (None, None) => i64::MAX,
    };

    (lower <= upper).then_some((lower, upper))
}

fn i64_range(field: Field, lower: i64, upper: i64) -> Box<dyn Query> {
    Box::new(TantivyRangeQuery::new(
        Bound::Included(Term::from_field_i64(field, lower)),
        Bound::Included(Term::from_field_i64(field, upper)),
    ))
}

fn f64_range(field: Field, lower: Bound<f64>, upper: Bound<f64>) -> Box<dyn Query> {
    let value = |b: &Bound<f64>| match b {
        Bound::Included(x) | Bound::Excluded(x) => *x,
        Bound::Unbounded => f64::NAN,
    };
    let (lo, hi) = (value(&lower), value(&upper));
    let empty = lo.is_nan()
        || hi.is_nan()
        || lo > hi
        || (lo == hi && !(matches!(lower, Bound::Included(_)) && matches!(upper, Bound::Included(_))));
    if empty {
        return Box::new(EmptyQuery);
    }

    let term = |x: f64| Term::from_field_f64(field, x);
    Box::new(TantivyRangeQuery::new(lower.map(term), upper.map(term)))
}

// ============================================================================
// Tests
// ============================================================================
