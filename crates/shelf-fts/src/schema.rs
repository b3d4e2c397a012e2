//! Tantivy mapping of an [`IndexSchema`].
//!
//! Every flattened schema path becomes one Tantivy field:
//!
//! | Indexed kind | Tantivy field |
//! |--------------|---------------|
//! | keyword | `STRING` (raw tokenizer) |
//! | text | text with the declared analyzer, positions recorded |
//! | shingle | `STRING`, one term per precomputed shingle |
//! | integer | `i64`, `INDEXED \| FAST` |
//! | double | `f64`, `INDEXED \| FAST` |
//!
//! Only top-level paths are stored. Tantivy field names cannot carry the
//! dotted sub-field notation, so `name.auto_complete._2gram` is mapped to
//! `name__auto_complete___2gram`.

use std::collections::BTreeMap;

use shelf_core::schema::{IndexSchema, IndexedField, IndexedKind};
use shelf_core::{Error, Result};
use tantivy::schema::{
    FAST, Field, FieldEntry, FieldType, INDEXED, IndexRecordOption, NumericOptions, STORED,
    STRING, Schema, TextFieldIndexing, TextOptions,
};

/// Tokenizer Tantivy registers for unanalyzed strings.
pub const RAW_TOKENIZER: &str = "raw";

/// Tantivy field name for a dotted schema path.
pub fn tantivy_field_name(path: &str) -> String {
    path.replace('.', "__")
}

/// A schema path bound to its Tantivy field.
#[derive(Debug, Clone)]
pub struct MappedField {
    /// Tantivy field handle.
    pub field: Field,
    /// Schema declaration.
    pub indexed: IndexedField,
}

impl MappedField {
    /// Tokenizer used for this field's terms.
    pub fn tokenizer(&self) -> &str {
        match &self.indexed.kind {
            IndexedKind::Text { analyzer } => analyzer,
            _ => RAW_TOKENIZER,
        }
    }

    /// First segment of the path: the document attribute the field is built from.
    pub fn source(&self) -> &str {
        self.indexed
            .path
            .split('.')
            .next()
            .unwrap_or(&self.indexed.path)
    }
}

/// An [`IndexSchema`] together with its Tantivy schema.
#[derive(Clone)]
pub struct TantivyMapping {
    index_schema: IndexSchema,
    schema: Schema,
    fields: BTreeMap<String, MappedField>,
}

impl TantivyMapping {
    /// Build the Tantivy schema for `index_schema`.
    pub fn build(index_schema: &IndexSchema) -> Self {
        let mut builder = Schema::builder();
        let mut fields = BTreeMap::new();

        for indexed in index_schema.indexed_fields() {
            let name = tantivy_field_name(&indexed.path);
            let field = match &indexed.kind {
                IndexedKind::Keyword | IndexedKind::Shingle { .. } => {
                    builder.add_text_field(&name, keyword_options(indexed.stored))
                }
                IndexedKind::Text { analyzer } => {
                    builder.add_text_field(&name, text_options(analyzer, indexed.stored))
                }
                IndexedKind::Integer => {
                    builder.add_i64_field(&name, numeric_options(indexed.stored))
                }
                IndexedKind::Double => builder.add_f64_field(&name, numeric_options(indexed.stored)),
            };
            fields.insert(indexed.path.clone(), MappedField { field, indexed });
        }

        Self {
            index_schema: index_schema.clone(),
            schema: builder.build(),
            fields,
        }
    }

    /// Bind `index_schema` to the schema of an existing index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaIncompatible`] listing every field whose
    /// presence, type, analyzer, or storage differs from the expected mapping.
    pub fn bind(index_schema: &IndexSchema, existing: &Schema) -> Result<Self> {
        let expected = Self::build(index_schema);
        let differences = expected.differences(existing);
        if !differences.is_empty() {
            return Err(Error::schema_incompatible(index_schema.name(), differences));
        }

        let mut fields = BTreeMap::new();
        for (path, mapped) in &expected.fields {
            let field = existing
                .get_field(&tantivy_field_name(path))
                .map_err(|e| Error::index_with_source(format!("Field '{path}' vanished"), e))?;
            fields.insert(
                path.clone(),
                MappedField {
                    field,
                    indexed: mapped.indexed.clone(),
                },
            );
        }

        Ok(Self {
            index_schema: index_schema.clone(),
            schema: existing.clone(),
            fields,
        })
    }

    /// One human-readable entry per field that differs from `actual`.
    pub fn differences(&self, actual: &Schema) -> Vec<String> {
        let mut differences = Vec::new();

        for (path, mapped) in &self.fields {
            let name = tantivy_field_name(path);
            let expected = describe(self.schema.get_field_entry(mapped.field));
            match actual.get_field(&name) {
                Ok(field) => {
                    let found = describe(actual.get_field_entry(field));
                    if found != expected {
                        differences.push(format!("field '{path}' is {found}, expected {expected}"));
                    }
                }
                Err(_) => differences.push(format!("field '{path}' is missing")),
            }
        }

        for (_, entry) in actual.fields() {
            let known = self
                .fields
                .keys()
                .any(|path| tantivy_field_name(path) == entry.name());
            if !known {
                differences.push(format!("unexpected field '{}'", entry.name()));
            }
        }

        differences
    }

    /// The declared schema.
    pub fn index_schema(&self) -> &IndexSchema {
        &self.index_schema
    }

    /// The Tantivy schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Look up a schema path.
    pub fn field(&self, path: &str) -> Option<&MappedField> {
        self.fields.get(path)
    }

    /// Look up a schema path, failing with a query error if it is unknown.
    pub fn require(&self, path: &str) -> Result<&MappedField> {
        self.field(path).ok_or_else(|| {
            Error::query(format!(
                "Unknown field '{path}' in index '{}'",
                self.index_schema.name()
            ))
        })
    }

    /// Every mapped field, in path order.
    pub fn fields(&self) -> impl Iterator<Item = &MappedField> {
        self.fields.values()
    }

    /// The id field.
    pub fn id_field(&self) -> Result<&MappedField> {
        self.require(self.index_schema.id_field())
    }
}

impl std::fmt::Debug for TantivyMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TantivyMapping")
            .field("index", &self.index_schema.name())
            .field("field_count", &self.fields.len())
            .finish()
    }
}

fn keyword_options(stored: bool) -> TextOptions {
    if stored { STRING | STORED } else { STRING }
}

fn text_options(analyzer: &str, stored: bool) -> TextOptions {
    let options = TextOptions::default().set_indexing_options(
        TextFieldIndexing::default()
            .set_tokenizer(analyzer)
            .set_index_option(IndexRecordOption::WithFreqsAndPositions),
    );
    if stored { options.set_stored() } else { options }
}

fn numeric_options(stored: bool) -> NumericOptions {
    let options: NumericOptions = (INDEXED | FAST).into();
    if stored { options.set_stored() } else { options }
}

/// Short description of a field entry, used to compare mappings.
fn describe(entry: &FieldEntry) -> String {
    let kind = match entry.field_type() {
        FieldType::Str(options) => match options.get_indexing_options() {
            Some(indexing) if indexing.tokenizer() == RAW_TOKENIZER => "keyword".to_string(),
            Some(indexing) => format!("text[{}]", indexing.tokenizer()),
            None => "unindexed text".to_string(),
        },
        FieldType::I64(_) => "integer".to_string(),
        FieldType::F64(_) => "double".to_string(),
        other => format!("{:?}", other.value_type()).to_lowercase(),
    };
    if entry.is_stored() {
        format!("{kind} (stored)")
    } else {
        kind
    }
}

// ============================================================================
// Tests
// ============================================================================
