//! Input and output records of the IPA post-processing pipeline.
//!
//! Inputs mirror what the upstream phone recognizer emits; outputs are the
//! serialized transcript handed to downstream consumers.

use crate::error::Result;
use crate::registry::Notation;
use crate::registry::features::{FeatureVector, SecondaryArticulation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One observed phonetic unit. Read-only once produced upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoneToken {
    /// Symbol from a known classifier, in `notation` (or any notation if unset).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notation: Option<Notation>,
    /// Pseudo-phone cluster from unsupervised discovery; takes precedence over `symbol`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<String>,
    pub start_ms: u64,
    pub end_ms: u64,
    /// Acoustic confidence in `[0, 1]`.
    pub confidence: f32,
    /// Upstream candidate distribution, used for best-N rendering.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<Candidate>,
    /// Articulatory estimate for cluster tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<FeatureVector>,
}

impl PhoneToken {
    pub fn symbol(symbol: &str, start_ms: u64, end_ms: u64, confidence: f32) -> Self {
        Self {
            symbol: Some(symbol.to_string()),
            notation: None,
            cluster_id: None,
            start_ms,
            end_ms,
            confidence,
            candidates: Vec::new(),
            features: None,
        }
    }

    pub fn cluster(cluster_id: &str, start_ms: u64, end_ms: u64, confidence: f32) -> Self {
        Self {
            symbol: None,
            notation: None,
            cluster_id: Some(cluster_id.to_string()),
            start_ms,
            end_ms,
            confidence,
            candidates: Vec::new(),
            features: None,
        }
    }

    pub fn with_candidates(mut self, candidates: Vec<Candidate>) -> Self {
        self.candidates = candidates;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub symbol: String,
    pub probability: f32,
}

/// One point of the auxiliary pitch/energy contour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProsodySample {
    pub time_ms: u64,
    /// `None` for unvoiced frames.
    #[serde(default)]
    pub pitch_hz: Option<f32>,
    #[serde(default)]
    pub energy: Option<f32>,
}

/// Externally supplied syllable, inclusive segment-local token indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Syllable {
    pub start: usize,
    pub end: usize,
    /// Stress asserted upstream; overrides the prominence estimate.
    #[serde(default)]
    pub stress: Option<StressLevel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub segment_id: u64,
    pub utterance_id: String,
    pub tokens: Vec<PhoneToken>,
    #[serde(default)]
    pub prosody: Vec<ProsodySample>,
    #[serde(default)]
    pub syllables: Vec<Syllable>,
}

/// All segments of one utterance plus its language hint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    pub utterance_id: String,
    #[serde(default)]
    pub language: Option<String>,
    /// Default notation for tokens that do not name one.
    #[serde(default)]
    pub notation: Option<Notation>,
    pub segments: Vec<Segment>,
}

/// Inclusive range of utterance-level token indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenSpan {
    pub start: usize,
    pub end: usize,
}

impl TokenSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn single(index: usize) -> Self {
        Self::new(index, index)
    }

    pub fn overlaps(&self, other: &TokenSpan) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    pub fn contains(&self, index: usize) -> bool {
        self.start <= index && index <= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    Confident,
    Uncertain,
    Placeholder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressLevel {
    Primary,
    Secondary,
    Unstressed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToneNotation {
    /// Chao digits, e.g. `³¹`.
    #[default]
    Level,
    /// Tone letters, e.g. `˧˩`.
    Contour,
}

/// Quantized tone: contour points on a `scale`-level grid, 1 = lowest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tone {
    pub levels: Vec<u8>,
    pub scale: u8,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Suprasegmental {
    Tone(Tone),
    Stress(StressLevel),
    Length,
    Nasalization,
    SecondaryArticulation(SecondaryArticulation),
}

impl Suprasegmental {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Suprasegmental::Tone(_) => "tone",
            Suprasegmental::Stress(_) => "stress",
            Suprasegmental::Length => "length",
            Suprasegmental::Nasalization => "nasalization",
            Suprasegmental::SecondaryArticulation(_) => "secondary_articulation",
        }
    }

    /// Stable ordering key across kinds.
    pub(crate) fn kind_rank(&self) -> u8 {
        match self {
            Suprasegmental::Stress(_) => 0,
            Suprasegmental::Tone(_) => 1,
            Suprasegmental::Length => 2,
            Suprasegmental::Nasalization => 3,
            Suprasegmental::SecondaryArticulation(_) => 4,
        }
    }
}

/// A suprasegmental annotation layered over contiguous tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuprasegmentalEvent {
    pub event: Suprasegmental,
    pub span: TokenSpan,
    /// Mean effective confidence of the covered tokens.
    pub confidence: f32,
}

/// Working representation of one phone as it moves through the stages.
#[derive(Debug, Clone, PartialEq)]
pub struct Phone {
    pub glyph: String,
    pub diacritics: Vec<String>,
    /// Length asserted by the symbol itself (`aː`, `a:`).
    pub long: bool,
    pub placeholder: bool,
    /// Utterance-level token index.
    pub index: usize,
    pub segment_id: u64,
    pub utterance_id: Arc<str>,
    pub start_ms: u64,
    pub end_ms: u64,
    /// Acoustic confidence scaled by any mapping penalty.
    pub confidence: f32,
    pub candidates: Vec<Candidate>,
    pub rules: Vec<String>,
}

impl Phone {
    /// Base glyph followed by its diacritics.
    pub fn text(&self) -> String {
        let mut text = self.glyph.clone();
        for mark in &self.diacritics {
            text.push_str(mark);
        }
        text
    }

    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }
}

/// One rendered glyph of the final transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedGlyph {
    /// Display text including brackets and suprasegmental marks.
    pub text: String,
    /// Base glyph plus diacritics, or the placeholder.
    pub symbol: String,
    pub mode: RenderMode,
    pub start_ms: u64,
    pub end_ms: u64,
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<String>,
    pub segment_id: u64,
    pub source: TokenSpan,
}

/// Audit trail of everything the pipeline did to an utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogEntry {
    UnknownSymbol {
        segment_id: u64,
        position: usize,
        symbol: String,
    },
    ClusterMapped {
        segment_id: u64,
        position: usize,
        cluster_id: String,
        partition: String,
        glyph: String,
        penalty: f32,
    },
    RuleApplied {
        segment_id: u64,
        position: usize,
        original: String,
        rule_id: String,
        replacement: String,
    },
    AlignmentMismatch {
        segment_id: u64,
        start: usize,
        end: usize,
        reason: String,
    },
    EventConflict {
        segment_id: u64,
        event: String,
        dropped: TokenSpan,
        kept: TokenSpan,
    },
    UncertainRender {
        segment_id: u64,
        position: usize,
        confidence: f32,
        alternatives: usize,
    },
    PlaceholderRender {
        segment_id: u64,
        position: usize,
        confidence: f32,
    },
    RepeatsCollapsed {
        segment_id: u64,
        span: TokenSpan,
        symbol: String,
        count: usize,
    },
    BoundaryMerged {
        left_segment: u64,
        right_segment: u64,
        symbol: String,
    },
}

impl LogEntry {
    pub fn kind_name(&self) -> &'static str {
        match self {
            LogEntry::UnknownSymbol { .. } => "unknown_symbol",
            LogEntry::ClusterMapped { .. } => "cluster_mapped",
            LogEntry::RuleApplied { .. } => "rule_applied",
            LogEntry::AlignmentMismatch { .. } => "alignment_mismatch",
            LogEntry::EventConflict { .. } => "event_conflict",
            LogEntry::UncertainRender { .. } => "uncertain_render",
            LogEntry::PlaceholderRender { .. } => "placeholder_render",
            LogEntry::RepeatsCollapsed { .. } => "repeats_collapsed",
            LogEntry::BoundaryMerged { .. } => "boundary_merged",
        }
    }

    /// Segment the entry belongs to; boundary merges report the earlier one.
    pub fn segment_id(&self) -> u64 {
        match self {
            LogEntry::UnknownSymbol { segment_id, .. }
            | LogEntry::ClusterMapped { segment_id, .. }
            | LogEntry::RuleApplied { segment_id, .. }
            | LogEntry::AlignmentMismatch { segment_id, .. }
            | LogEntry::EventConflict { segment_id, .. }
            | LogEntry::UncertainRender { segment_id, .. }
            | LogEntry::PlaceholderRender { segment_id, .. }
            | LogEntry::RepeatsCollapsed { segment_id, .. } => *segment_id,
            LogEntry::BoundaryMerged { left_segment, .. } => *left_segment,
        }
    }
}

/// Final output for one utterance. Immutable once assembled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedTranscript {
    pub utterance_id: String,
    pub language: String,
    pub glyphs: Vec<RenderedGlyph>,
    #[serde(default)]
    pub events: Vec<SuprasegmentalEvent>,
    #[serde(default)]
    pub log: Vec<LogEntry>,
}

impl AnnotatedTranscript {
    /// The transcript as one IPA string.
    pub fn ipa(&self) -> String {
        self.glyphs.iter().map(|g| g.text.as_str()).collect()
    }

    /// IPA text of a single segment.
    pub fn segment_ipa(&self, segment_id: u64) -> String {
        self.glyphs
            .iter()
            .filter(|g| g.segment_id == segment_id)
            .map(|g| g.text.as_str())
            .collect()
    }

    /// Segment ids in output order, deduplicated.
    pub fn segment_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = Vec::new();
        for glyph in &self.glyphs {
            if !ids.contains(&glyph.segment_id) {
                ids.push(glyph.segment_id);
            }
        }
        ids
    }

    /// Time span covered by the transcript.
    pub fn time_span_ms(&self) -> Option<(u64, u64)> {
        let start = self.glyphs.iter().map(|g| g.start_ms).min()?;
        let end = self.glyphs.iter().map(|g| g.end_ms).max()?;
        Some((start, end))
    }

    pub fn count_mode(&self, mode: RenderMode) -> usize {
        self.glyphs.iter().filter(|g| g.mode == mode).count()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
