//! Index schema for product documents.
//!
//! The schema is an explicit value rather than per-field annotations: a tree
//! of [`FieldSpec`]s that the search adapter turns into its native mapping at
//! startup. Query construction refers to the flattened field paths listed in
//! [`fields`], so the two must stay in lockstep.
//!
//! # Product schema
//!
//! | Path | Kind | Analyzer |
//! |------|------|----------|
//! | `id` | keyword | - |
//! | `name` | text | `products_name_analyzer` |
//! | `name.auto_complete` | search-as-you-type | `products_autocomplete_analyzer` |
//! | `name.auto_complete._2gram` | shingle (2) | `products_autocomplete_analyzer` |
//! | `name.auto_complete._3gram` | shingle (3) | `products_autocomplete_analyzer` |
//! | `description` | text | `products_description_analyzer` |
//! | `price` | integer | - |
//! | `rating` | double | - |
//! | `category` | text | `products_category_analyzer` |
//! | `category.raw` | keyword | - |

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Name of the product index.
pub const PRODUCTS_INDEX: &str = "products";

/// Flattened field paths of the product schema.
pub mod fields {
    /// Document id (decimal product id).
    pub const ID: &str = "id";
    /// Analyzed product name.
    pub const NAME: &str = "name";
    /// Search-as-you-type root of the name.
    pub const NAME_AUTO_COMPLETE: &str = "name.auto_complete";
    /// Two-token shingles of the name.
    pub const NAME_AUTO_COMPLETE_2GRAM: &str = "name.auto_complete._2gram";
    /// Three-token shingles of the name.
    pub const NAME_AUTO_COMPLETE_3GRAM: &str = "name.auto_complete._3gram";
    /// Analyzed description.
    pub const DESCRIPTION: &str = "description";
    /// Integer price.
    pub const PRICE: &str = "price";
    /// Double rating.
    pub const RATING: &str = "rating";
    /// Analyzed category.
    pub const CATEGORY: &str = "category";
    /// Exact-match category keyword.
    pub const CATEGORY_RAW: &str = "category.raw";
}

/// Analyzer names referenced by the product schema.
pub mod analyzers {
    /// Analyzer for `name`.
    pub const NAME: &str = "products_name_analyzer";
    /// Analyzer for `description`.
    pub const DESCRIPTION: &str = "products_description_analyzer";
    /// Analyzer for `category`.
    pub const CATEGORY: &str = "products_category_analyzer";
    /// Analyzer for `name.auto_complete` and its shingles.
    pub const AUTOCOMPLETE: &str = "products_autocomplete_analyzer";
}

/// Declared type of a schema field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    /// Exact-match, unanalyzed string.
    Keyword,
    /// Analyzed full text.
    Text {
        /// Analyzer name.
        analyzer: String,
    },
    /// Text indexed for as-you-type matching, with shingle sub-fields
    /// `_2gram` up to `_{max_shingle_size}gram`.
    SearchAsYouType {
        /// Analyzer name.
        analyzer: String,
        /// Largest shingle size (at least 2).
        max_shingle_size: usize,
    },
    /// 64-bit signed integer, range-queryable.
    Integer,
    /// 64-bit float, range-queryable.
    Double,
}

/// A declared field and its sub-fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name relative to its parent.
    pub name: String,
    /// Declared type.
    pub kind: FieldKind,
    /// Sub-fields indexed from the same source value.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_fields: Vec<FieldSpec>,
}

impl FieldSpec {
    /// A keyword field.
    pub fn keyword(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Keyword)
    }

    /// An analyzed text field.
    pub fn text(name: impl Into<String>, analyzer: impl Into<String>) -> Self {
        Self::new(
            name,
            FieldKind::Text {
                analyzer: analyzer.into(),
            },
        )
    }

    /// A search-as-you-type field with shingles up to `max_shingle_size`.
    pub fn search_as_you_type(
        name: impl Into<String>,
        analyzer: impl Into<String>,
        max_shingle_size: usize,
    ) -> Self {
        Self::new(
            name,
            FieldKind::SearchAsYouType {
                analyzer: analyzer.into(),
                max_shingle_size,
            },
        )
    }

    /// An integer field.
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    /// A double field.
    pub fn double(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Double)
    }

    /// Add a sub-field.
    pub fn with_sub_field(mut self, sub_field: FieldSpec) -> Self {
        self.sub_fields.push(sub_field);
        self
    }

    fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            sub_fields: Vec::new(),
        }
    }
}

/// How a flattened field path is indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IndexedKind {
    /// Single unanalyzed term.
    Keyword,
    /// Token stream of the named analyzer.
    Text {
        /// Analyzer name.
        analyzer: String,
    },
    /// Space-joined runs of `size` consecutive tokens of the named analyzer.
    Shingle {
        /// Analyzer name.
        analyzer: String,
        /// Tokens per shingle.
        size: usize,
    },
    /// 64-bit signed integer.
    Integer,
    /// 64-bit float.
    Double,
}

impl IndexedKind {
    /// Analyzer used by this field, if any.
    pub fn analyzer(&self) -> Option<&str> {
        match self {
            IndexedKind::Text { analyzer } | IndexedKind::Shingle { analyzer, .. } => {
                Some(analyzer)
            }
            _ => None,
        }
    }
}

/// A flattened, concretely indexed field path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedField {
    /// Dotted path, e.g. `name.auto_complete._2gram`.
    pub path: String,
    /// How the value is indexed.
    pub kind: IndexedKind,
    /// Whether the original value is kept for retrieval.
    pub stored: bool,
}

/// Declared schema of a search index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSchema {
    name: String,
    id_field: String,
    fields: Vec<FieldSpec>,
}

impl IndexSchema {
    /// Create a schema with an id keyword field and the given fields.
    pub fn new(name: impl Into<String>, id_field: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            name: name.into(),
            id_field: id_field.into(),
            fields,
        }
    }

    /// The product schema.
    pub fn products() -> Self {
        Self::new(
            PRODUCTS_INDEX,
            fields::ID,
            vec![
                FieldSpec::text("name", analyzers::NAME).with_sub_field(
                    FieldSpec::search_as_you_type("auto_complete", analyzers::AUTOCOMPLETE, 3),
                ),
                FieldSpec::text("description", analyzers::DESCRIPTION),
                FieldSpec::integer("price"),
                FieldSpec::double("rating"),
                FieldSpec::text("category", analyzers::CATEGORY)
                    .with_sub_field(FieldSpec::keyword("raw")),
            ],
        )
    }

    /// Index name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the document id field.
    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    /// Every concretely indexed path, id first, parents before sub-fields.
    pub fn indexed_fields(&self) -> Vec<IndexedField> {
        let mut out = vec![IndexedField {
            path: self.id_field.clone(),
            kind: IndexedKind::Keyword,
            stored: true,
        }];
        for spec in &self.fields {
            flatten(spec, None, &mut out);
        }
        out
    }

    /// Look up a flattened field by path.
    pub fn field(&self, path: &str) -> Option<IndexedField> {
        self.indexed_fields().into_iter().find(|f| f.path == path)
    }

    /// Names of all analyzers the schema references.
    pub fn analyzers(&self) -> BTreeSet<String> {
        self.indexed_fields()
            .iter()
            .filter_map(|f| f.kind.analyzer().map(str::to_string))
            .collect()
    }
}

fn flatten(spec: &FieldSpec, parent: Option<&str>, out: &mut Vec<IndexedField>) {
    let path = match parent {
        Some(parent) => format!("{parent}.{}", spec.name),
        None => spec.name.clone(),
    };
    // Only top-level values are retained; sub-fields are derived views.
    let stored = parent.is_none();

    match &spec.kind {
        FieldKind::Keyword => out.push(IndexedField {
            path: path.clone(),
            kind: IndexedKind::Keyword,
            stored,
        }),
        FieldKind::Text { analyzer } => out.push(IndexedField {
            path: path.clone(),
            kind: IndexedKind::Text {
                analyzer: analyzer.clone(),
            },
            stored,
        }),
        FieldKind::SearchAsYouType {
            analyzer,
            max_shingle_size,
        } => {
            out.push(IndexedField {
                path: path.clone(),
                kind: IndexedKind::Text {
                    analyzer: analyzer.clone(),
                },
                stored,
            });
            for size in 2..=*max_shingle_size {
                out.push(IndexedField {
                    path: format!("{path}._{size}gram"),
                    kind: IndexedKind::Shingle {
                        analyzer: analyzer.clone(),
                        size,
                    },
                    stored: false,
                });
            }
        }
        FieldKind::Integer => out.push(IndexedField {
            path: path.clone(),
            kind: IndexedKind::Integer,
            stored,
        }),
        FieldKind::Double => out.push(IndexedField {
            path: path.clone(),
            kind: IndexedKind::Double,
            stored,
        }),
    }

    for sub in &spec.sub_fields {
        flatten(sub, Some(&path), out);
    }
}

/// Build the shingles of `tokens`: every run of `size` consecutive tokens,
/// joined with a single space.
///
/// Fewer than `size` tokens produce no shingles.
pub fn shingles<S: AsRef<str>>(tokens: &[S], size: usize) -> Vec<String> {
    if size == 0 || tokens.len() < size {
        return Vec::new();
    }
    tokens
        .windows(size)
        .map(|w| {
            w.iter()
                .map(AsRef::as_ref)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
