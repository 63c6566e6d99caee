//! ipaflow - IPA mapping and post-processing for phone recognizer output
//!
//! Turns phone-level recognizer tokens (known symbols in IPA, X-SAMPA or
//! ARPAbet, or unlabeled discovered clusters) into annotated IPA transcripts:
//! canonical glyphs, language-specific allophones, tone/stress/length marks,
//! and a confidence-aware rendering that never guesses below threshold.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod assembler;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod language;
pub mod mapping;
#[cfg(feature = "cli")]
pub mod output;
pub mod pipeline;
pub mod prosody;
pub mod registry;
pub mod render;
pub mod rules;
pub mod types;

// Pipeline
pub use pipeline::{Engine, Input, group_utterances};

// Error handling
pub use error::{IpaError, Result};

// Config
pub use config::{Config, LanguageProfile};

// Core stages (for custom composition)
pub use mapping::{ClusterMapper, JsonFileStore, MappingService, MappingStore, MemoryStore};
pub use registry::{Notation, Resolved, SymbolRegistry};
pub use rules::{AllophoneRule, RuleEngine};

// Data model
pub use types::{
    AnnotatedTranscript, LogEntry, PhoneToken, RenderMode, RenderedGlyph, Segment,
    SuprasegmentalEvent, Utterance,
};
