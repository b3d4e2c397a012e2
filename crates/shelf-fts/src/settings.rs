//! Analysis settings for the product index.
//!
//! Analyzers are declared in a JSON settings document and registered with the
//! index's tokenizer manager under their declared names, which are the names
//! the schema refers to:
//!
//! ```json
//! {
//!   "analysis": {
//!     "analyzer": {
//!       "products_name_analyzer": {
//!         "tokenizer": "simple",
//!         "filter": ["lowercase", "ascii_folding", "english_stemmer"]
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! The settings shipped with the crate live in `resources/product-settings.json`.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use shelf_core::{Error, Result};
use tantivy::tokenizer::{
    AsciiFoldingFilter, Language, LowerCaser, RawTokenizer, RemoveLongFilter, SimpleTokenizer,
    Stemmer, TextAnalyzer, TokenStream, TokenizerManager, WhitespaceTokenizer,
};

/// Settings embedded at build time.
const EMBEDDED_SETTINGS: &str = include_str!("../resources/product-settings.json");

/// Tokens longer than this (in bytes) are dropped by `remove_long`.
pub const MAX_TOKEN_LENGTH: usize = 40;

/// Splits text into tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenizerKind {
    /// Split on any non-alphanumeric character.
    Simple,
    /// Split on whitespace.
    Whitespace,
    /// The whole input is one token.
    Raw,
}

/// Rewrites or drops tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    /// Lowercase every token.
    Lowercase,
    /// Fold accented characters to ASCII.
    AsciiFolding,
    /// Porter stemming for English.
    EnglishStemmer,
    /// Drop tokens longer than [`MAX_TOKEN_LENGTH`].
    RemoveLong,
}

/// One named analyzer: a tokenizer followed by filters, applied in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerDefinition {
    /// Tokenizer.
    pub tokenizer: TokenizerKind,
    /// Filters, in order.
    #[serde(default)]
    pub filter: Vec<FilterKind>,
}

impl AnalyzerDefinition {
    /// Build a Tantivy analyzer from this definition.
    pub fn build(&self) -> TextAnalyzer {
        let mut builder = match self.tokenizer {
            TokenizerKind::Simple => TextAnalyzer::builder(SimpleTokenizer::default()).dynamic(),
            TokenizerKind::Whitespace => {
                TextAnalyzer::builder(WhitespaceTokenizer::default()).dynamic()
            }
            TokenizerKind::Raw => TextAnalyzer::builder(RawTokenizer::default()).dynamic(),
        };
        for filter in &self.filter {
            builder = match filter {
                FilterKind::Lowercase => builder.filter_dynamic(LowerCaser),
                FilterKind::AsciiFolding => builder.filter_dynamic(AsciiFoldingFilter),
                FilterKind::EnglishStemmer => {
                    builder.filter_dynamic(Stemmer::new(Language::English))
                }
                FilterKind::RemoveLong => {
                    builder.filter_dynamic(RemoveLongFilter::limit(MAX_TOKEN_LENGTH))
                }
            };
        }
        builder.build()
    }
}

/// The `analysis` section of the settings document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    /// Analyzers by name.
    #[serde(default)]
    pub analyzer: BTreeMap<String, AnalyzerDefinition>,
}

/// Index analysis settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSettings {
    /// Analyzer declarations.
    #[serde(default)]
    pub analysis: Analysis,
}

impl AnalysisSettings {
    /// The settings shipped with this crate.
    pub fn embedded() -> Result<Self> {
        Self::from_json(EMBEDDED_SETTINGS)
    }

    /// Parse a settings document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a settings document from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let settings = Self::from_json(&json).map_err(|e| {
            Error::config(format!(
                "Invalid analysis settings in {}: {e}",
                path.display()
            ))
        })?;
        log::debug!("Loaded analysis settings from {}", path.display());
        Ok(settings)
    }

    /// Embedded settings, or the document at `path` when given.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Self::embedded(),
        }
    }

    /// Definition of the analyzer called `name`.
    pub fn analyzer(&self, name: &str) -> Option<&AnalyzerDefinition> {
        self.analysis.analyzer.get(name)
    }

    /// Register every analyzer in `required` with `manager`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first required analyzer that
    /// the settings do not define.
    pub fn register(&self, manager: &TokenizerManager, required: &BTreeSet<String>) -> Result<()> {
        for name in required {
            let definition = self.analyzer(name).ok_or_else(|| {
                Error::config(format!(
                    "Analyzer '{name}' is not defined in the analysis settings"
                ))
            })?;
            manager.register(name, definition.build());
        }
        Ok(())
    }
}

/// A token with its byte span in the original text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzedToken {
    /// Token text after filtering.
    pub text: String,
    /// Start byte offset in the source.
    pub from: usize,
    /// End byte offset in the source.
    pub to: usize,
}

/// Run `analyzer` over `text`.
pub fn analyze(analyzer: &mut TextAnalyzer, text: &str) -> Vec<AnalyzedToken> {
    let mut stream = analyzer.token_stream(text);
    let mut tokens = Vec::new();
    while stream.advance() {
        let token = stream.token();
        tokens.push(AnalyzedToken {
            text: token.text.clone(),
            from: token.offset_from,
            to: token.offset_to,
        });
    }
    tokens
}

/// Token texts of `text` under `analyzer`.
pub fn analyze_terms(analyzer: &mut TextAnalyzer, text: &str) -> Vec<String> {
    analyze(analyzer, text).into_iter().map(|t| t.text).collect()
}

// ============================================================================
// Tests
// ============================================================================
