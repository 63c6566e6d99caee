//! Error types for ipaflow.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IpaError {
    // Symbol registry errors
    #[error("Unknown symbol '{symbol}' ({notation})")]
    UnknownSymbol { symbol: String, notation: String },

    #[error("Duplicate symbol entry for glyph '{glyph}'")]
    DuplicateSymbol { glyph: String },

    #[error("Alias '{alias}' ({notation}) maps to both '{first}' and '{second}'")]
    AmbiguousAlias {
        alias: String,
        notation: String,
        first: String,
        second: String,
    },

    // Rule engine errors
    #[error("Invalid rule definition '{rule_id}' for language '{language}': {message}")]
    InvalidRuleDefinition {
        rule_id: String,
        language: String,
        message: String,
    },

    // Mapping table errors
    #[error("Failed to persist mapping table for '{language}': {message}")]
    MappingPersistenceFailure { language: String, message: String },

    // Suprasegmental alignment errors
    #[error("Alignment mismatch for tokens {start}..={end}: {message}")]
    AlignmentMismatch {
        start: usize,
        end: usize,
        message: String,
    },

    // Configuration errors
    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Batch processing errors
    #[error("Worker failed: {message}")]
    Worker { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

impl IpaError {
    pub(crate) fn unknown_symbol(symbol: impl Into<String>, notation: impl Into<String>) -> Self {
        Self::UnknownSymbol {
            symbol: symbol.into(),
            notation: notation.into(),
        }
    }

    pub(crate) fn invalid_rule(
        rule_id: impl Into<String>,
        language: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidRuleDefinition {
            rule_id: rule_id.into(),
            language: language.into(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigInvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, IpaError>;
