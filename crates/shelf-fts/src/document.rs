//! Conversion between [`ProductDocument`] and Tantivy documents.
//!
//! The converter is driven by the mapping rather than by hard-coded fields:
//! each mapped path reads the document attribute named by its first segment
//! (`category.raw` reads `category`) and indexes it according to its kind.
//! Shingle fields get one term per run of consecutive analyzer tokens.

use shelf_core::schema::{IndexedKind, shingles};
use shelf_core::{Error, ProductDocument, Result};
use tantivy::TantivyDocument;
use tantivy::schema::Value;
use tantivy::tokenizer::TokenizerManager;

use crate::schema::{MappedField, TantivyMapping};
use crate::settings::analyze_terms;

/// A document attribute value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SourceValue<'a> {
    /// Text attribute.
    Text(&'a str),
    /// Integer attribute.
    Integer(i64),
    /// Float attribute.
    Double(f64),
}

/// Value of attribute `name` in `doc`, or `None` if absent or unknown.
pub fn source_value<'a>(doc: &'a ProductDocument, name: &str) -> Option<SourceValue<'a>> {
    match name {
        "id" => Some(SourceValue::Text(&doc.id)),
        "name" => Some(SourceValue::Text(&doc.name)),
        "description" => doc.description.as_deref().map(SourceValue::Text),
        "price" => Some(SourceValue::Integer(doc.price)),
        "rating" => doc.rating.map(SourceValue::Double),
        "category" => Some(SourceValue::Text(&doc.category)),
        _ => None,
    }
}

/// Build the Tantivy document for `doc`.
pub fn to_tantivy(
    doc: &ProductDocument,
    mapping: &TantivyMapping,
    tokenizers: &TokenizerManager,
) -> Result<TantivyDocument> {
    let mut out = TantivyDocument::new();

    for mapped in mapping.fields() {
        let Some(value) = source_value(doc, mapped.source()) else {
            continue;
        };

        match (&mapped.indexed.kind, value) {
            (IndexedKind::Keyword | IndexedKind::Text { .. }, SourceValue::Text(text)) => {
                out.add_text(mapped.field, text);
            }
            (IndexedKind::Shingle { analyzer, size }, SourceValue::Text(text)) => {
                let mut analyzer = tokenizers.get(analyzer).ok_or_else(|| {
                    Error::index(format!("Analyzer '{analyzer}' is not registered"))
                })?;
                let tokens = analyze_terms(&mut analyzer, text);
                for shingle in shingles(&tokens, *size) {
                    out.add_text(mapped.field, &shingle);
                }
            }
            (IndexedKind::Integer, SourceValue::Integer(n)) => out.add_i64(mapped.field, n),
            (IndexedKind::Double, SourceValue::Double(x)) => out.add_f64(mapped.field, x),
            (IndexedKind::Double, SourceValue::Integer(n)) => {
                out.add_f64(mapped.field, n as f64);
            }
            (kind, value) => return Err(mismatch(mapped, kind, value)),
        }
    }

    Ok(out)
}

fn mismatch(mapped: &MappedField, kind: &IndexedKind, value: SourceValue<'_>) -> Error {
    Error::index(format!(
        "Field '{}' is indexed as {kind:?} but the document holds {value:?}",
        mapped.indexed.path
    ))
}

/// Rebuild a [`ProductDocument`] from the stored fields of `doc`.
pub fn from_tantivy(doc: &TantivyDocument, mapping: &TantivyMapping) -> Result<ProductDocument> {
    let text = |path: &str| -> Result<Option<String>> {
        let field = mapping.require(path)?.field;
        Ok(doc
            .get_first(field)
            .and_then(|v| v.as_str())
            .map(str::to_string))
    };
    let required = |path: &str, value: Option<String>| {
        value.ok_or_else(|| missing_stored(path))
    };

    let price_field = mapping.require("price")?.field;
    let rating_field = mapping.require("rating")?.field;

    Ok(ProductDocument {
        id: required("id", text("id")?)?,
        name: required("name", text("name")?)?,
        description: text("description")?,
        price: doc
            .get_first(price_field)
            .and_then(|v| v.as_i64())
            .ok_or_else(|| missing_stored("price"))?,
        rating: doc.get_first(rating_field).and_then(|v| v.as_f64()),
        category: required("category", text("category")?)?,
    })
}

fn missing_stored(path: &str) -> Error {
    Error::query(format!("Stored document is missing field '{path}'"))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::settings::AnalysisSettings;
    use shelf_core::IndexSchema;
    use shelf_core::schema::fields;

    fn setup() -> (TantivyMapping, TokenizerManager) {
        let index_schema = IndexSchema::products();
        let mapping = TantivyMapping::build(&index_schema);
        let tokenizers = TokenizerManager::default();
        AnalysisSettings::embedded()
            .unwrap()
            .register(&tokenizers, &index_schema.analyzers())
            .unwrap();
        (mapping, tokenizers)
    }

    fn apple_pie() -> ProductDocument {
        ProductDocument {
            id: "7".to_string(),
            name: "Apple Pie Crust".to_string(),
            description: Some("Flaky".to_string()),
            price: 350,
            rating: Some(4.5),
            category: "Bakery".to_string(),
        }
    }

    fn texts(doc: &TantivyDocument, mapping: &TantivyMapping, path: &str) -> Vec<String> {
        let field = mapping.field(path).unwrap().field;
        doc.get_all(field)
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect()
    }

    #[test]
    fn test_source_value() {
        let doc = apple_pie();
        assert_eq!(source_value(&doc, "name"), Some(SourceValue::Text("Apple Pie Crust")));
        assert_eq!(source_value(&doc, "price"), Some(SourceValue::Integer(350)));
        assert_eq!(source_value(&doc, "rating"), Some(SourceValue::Double(4.5)));
        assert_eq!(source_value(&doc, "title"), None);
    }

    #[test]
    fn test_sub_fields_copy_the_source_value() {
        let (mapping, tokenizers) = setup();
        let doc = to_tantivy(&apple_pie(), &mapping, &tokenizers).unwrap();

        assert_eq!(texts(&doc, &mapping, fields::NAME_AUTO_COMPLETE), vec!["Apple Pie Crust"]);
        assert_eq!(texts(&doc, &mapping, fields::CATEGORY_RAW), vec!["Bakery"]);
    }

    #[test]
    fn test_shingles_are_precomputed() {
        let (mapping, tokenizers) = setup();
        let doc = to_tantivy(&apple_pie(), &mapping, &tokenizers).unwrap();

        assert_eq!(
            texts(&doc, &mapping, fields::NAME_AUTO_COMPLETE_2GRAM),
            vec!["apple pie", "pie crust"]
        );
        assert_eq!(
            texts(&doc, &mapping, fields::NAME_AUTO_COMPLETE_3GRAM),
            vec!["apple pie crust"]
        );
    }

    #[test]
    fn test_absent_optionals_are_skipped() {
        let (mapping, tokenizers) = setup();
        let mut product = apple_pie();
        product.description = None;
        product.rating = None;

        let doc = to_tantivy(&product, &mapping, &tokenizers).unwrap();
        assert!(texts(&doc, &mapping, fields::DESCRIPTION).is_empty());
        let rating = mapping.field(fields::RATING).unwrap().field;
        assert!(doc.get_first(rating).is_none());
    }

    #[test]
    fn test_round_trip_through_stored_fields() {
        let (mapping, tokenizers) = setup();
        let product = apple_pie();

        let doc = to_tantivy(&product, &mapping, &tokenizers).unwrap();
        assert_eq!(from_tantivy(&doc, &mapping).unwrap(), product);
    }

    #[test]
    fn test_missing_stored_id_is_error() {
        let (mapping, _) = setup();
        let err = from_tantivy(&TantivyDocument::new(), &mapping).unwrap_err();
        assert!(err.to_string().contains("'id'"));
    }

    #[test]
    fn test_unregistered_analyzer_is_index_error() {
        let mapping = TantivyMapping::build(&IndexSchema::products());
        let err = to_tantivy(&apple_pie(), &mapping, &TokenizerManager::default()).unwrap_err();
        assert!(matches!(err, Error::Index { .. }));
    }
}
