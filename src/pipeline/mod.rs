//! Utterance processing pipeline.
//!
//! Each utterance flows through symbol resolution and cluster mapping,
//! allophone rules, suprasegmental annotation, rendering and assembly.
//! Batches run on a fixed worker pool connected by bounded crossbeam channels.

pub mod orchestrator;
pub mod worker;

pub use orchestrator::Engine;

use crate::error::Result;
use crate::types::{Segment, Utterance};
use serde::Deserialize;
use std::collections::HashMap;

/// Accepted shapes of recognizer output.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Input {
    /// `{ "utterances": [...] }`
    Batch { utterances: Vec<Utterance> },
    /// A single utterance object.
    Single(Utterance),
    /// `{ "segments": [...] }`, a flat stream grouped by utterance id.
    Segments { segments: Vec<Segment> },
}

impl Input {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn into_utterances(self) -> Vec<Utterance> {
        match self {
            Input::Batch { utterances } => utterances,
            Input::Single(utterance) => vec![utterance],
            Input::Segments { segments } => group_utterances(segments),
        }
    }
}

/// Group a flat segment stream into utterances, in first-seen order.
///
/// Segments keep their relative order within an utterance. Language and
/// notation are left unset for the caller to fill in.
pub fn group_utterances(segments: Vec<Segment>) -> Vec<Utterance> {
    let mut utterances: Vec<Utterance> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for segment in segments {
        match positions.get(&segment.utterance_id) {
            Some(&position) => utterances[position].segments.push(segment),
            None => {
                positions.insert(segment.utterance_id.clone(), utterances.len());
                utterances.push(Utterance {
                    utterance_id: segment.utterance_id.clone(),
                    language: None,
                    notation: None,
                    segments: vec![segment],
                });
            }
        }
    }
    utterances
}
