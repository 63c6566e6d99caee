//! Allophone rule definitions and their TOML form.
//!
//! ```toml
//! [[rules]]
//! id = "en-nasal-velar"
//! language = "en"
//! priority = 10
//! trigger = "n"
//! followed_by = { kind = "consonant", place = "velar" }
//! replace = { symbol = "ŋ" }
//! ```

use crate::error::{IpaError, Result};
use crate::registry::features::{Backness, Features, Height, Manner, Place, SegmentKind};
use crate::registry::{Notation, SymbolRegistry};
use crate::types::Phone;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pattern glyph standing for "no neighbor in this utterance".
pub const BOUNDARY: &str = "#";

/// What a trigger or context position must look like.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Pattern {
    /// One base glyph, or `#` for an utterance edge.
    Symbol(String),
    AnyOf(Vec<String>),
    Class(FeatureClass),
}

/// Natural class over articulatory features. Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeatureClass {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<SegmentKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place: Option<Place>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manner: Option<Manner>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voiced: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<Height>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backness: Option<Backness>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rounded: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nasal: Option<bool>,
}

impl FeatureClass {
    pub fn vowel() -> Self {
        Self {
            kind: Some(SegmentKind::Vowel),
            ..Self::default()
        }
    }

    pub fn consonant() -> Self {
        Self {
            kind: Some(SegmentKind::Consonant),
            ..Self::default()
        }
    }

    pub fn with_place(mut self, place: Place) -> Self {
        self.place = Some(place);
        self
    }

    pub fn matches(&self, features: &Features) -> bool {
        if features.kind == SegmentKind::Placeholder {
            return false;
        }
        let nasal = features.nasalized || features.manner == Some(Manner::Nasal);
        self.kind.is_none_or(|k| k == features.kind)
            && self.place.is_none_or(|p| features.place == Some(p))
            && self.manner.is_none_or(|m| features.manner == Some(m))
            && self.voiced.is_none_or(|v| v == features.voiced)
            && self.height.is_none_or(|h| features.height == Some(h))
            && self.backness.is_none_or(|b| features.backness == Some(b))
            && self.rounded.is_none_or(|r| r == features.rounded)
            && self.nasal.is_none_or(|n| n == nasal)
    }

    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl fmt::Display for FeatureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        if let Some(kind) = self.kind {
            parts.push(snake(&kind));
        }
        if let Some(place) = self.place {
            parts.push(snake(&place));
        }
        if let Some(manner) = self.manner {
            parts.push(snake(&manner));
        }
        if let Some(height) = self.height {
            parts.push(snake(&height));
        }
        if let Some(backness) = self.backness {
            parts.push(snake(&backness));
        }
        for (flag, name) in [
            (self.voiced, "voiced"),
            (self.rounded, "rounded"),
            (self.nasal, "nasal"),
        ] {
            match flag {
                Some(true) => parts.push(format!("+{name}")),
                Some(false) => parts.push(format!("-{name}")),
                None => {}
            }
        }
        write!(f, "[{}]", parts.join(" "))
    }
}

fn snake<T: Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

impl Pattern {
    /// Whether `phone` (or its absence, at an edge) satisfies the pattern.
    pub fn matches(&self, phone: Option<&Phone>, registry: &SymbolRegistry) -> bool {
        match self {
            Pattern::Symbol(glyph) => glyph_matches(glyph, phone),
            Pattern::AnyOf(glyphs) => glyphs.iter().any(|g| glyph_matches(g, phone)),
            Pattern::Class(class) => phone.is_some_and(|p| {
                !p.placeholder && class.matches(&registry.features_of(&p.glyph, &p.diacritics))
            }),
        }
    }

    fn glyphs(&self) -> Vec<&str> {
        match self {
            Pattern::Symbol(glyph) => vec![glyph.as_str()],
            Pattern::AnyOf(glyphs) => glyphs.iter().map(String::as_str).collect(),
            Pattern::Class(_) => Vec::new(),
        }
    }

    fn validate(
        &self,
        role: &str,
        allow_boundary: bool,
        registry: &SymbolRegistry,
    ) -> std::result::Result<(), String> {
        match self {
            Pattern::AnyOf(glyphs) if glyphs.is_empty() => {
                return Err(format!("{role} lists no symbols"));
            }
            Pattern::Class(class) if class.is_empty() => {
                return Err(format!("{role} class sets no features"));
            }
            _ => {}
        }
        for glyph in self.glyphs() {
            if glyph == BOUNDARY {
                if !allow_boundary {
                    return Err(format!("{role} cannot be a boundary"));
                }
                continue;
            }
            if !registry.contains(glyph) {
                return Err(format!("{role} symbol '{glyph}' is not in the registry"));
            }
        }
        Ok(())
    }
}

fn glyph_matches(glyph: &str, phone: Option<&Phone>) -> bool {
    match phone {
        None => glyph == BOUNDARY,
        Some(p) => p.glyph == glyph,
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Symbol(glyph) => f.write_str(glyph),
            Pattern::AnyOf(glyphs) => write!(f, "{{{}}}", glyphs.join(",")),
            Pattern::Class(class) => write!(f, "{class}"),
        }
    }
}

/// Rewrite applied to a matching phone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Replacement {
    /// Replace the whole segment (base glyph and diacritics).
    Symbol(String),
    /// Add a diacritic to the segment.
    Diacritic(String),
}

impl fmt::Display for Replacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Replacement::Symbol(glyph) => f.write_str(glyph),
            Replacement::Diacritic(mark) => write!(f, "+◌{mark}"),
        }
    }
}

/// Context-sensitive rewrite `trigger -> replace / preceded_by _ followed_by`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllophoneRule {
    pub id: String,
    /// Rule set the rule belongs to; universal when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Lower tiers run first; equal priorities keep declaration order.
    #[serde(default)]
    pub priority: i32,
    pub trigger: Pattern,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preceded_by: Option<Pattern>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followed_by: Option<Pattern>,
    pub replace: Replacement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl AllophoneRule {
    /// Whether the rule fires at `index` of a frozen stream.
    ///
    /// Neighbors from a different utterance count as absent.
    pub fn matches_at(&self, stream: &[Phone], index: usize, registry: &SymbolRegistry) -> bool {
        let Some(target) = stream.get(index) else {
            return false;
        };
        if target.placeholder || !self.trigger.matches(Some(target), registry) {
            return false;
        }
        let same_utterance = |p: &&Phone| p.utterance_id == target.utterance_id;
        let previous = index
            .checked_sub(1)
            .and_then(|i| stream.get(i))
            .filter(same_utterance);
        let next = stream.get(index + 1).filter(same_utterance);

        self.preceded_by
            .as_ref()
            .is_none_or(|p| p.matches(previous, registry))
            && self
                .followed_by
                .as_ref()
                .is_none_or(|p| p.matches(next, registry))
    }

    /// Check the rule against the registry.
    pub fn validate(&self, registry: &SymbolRegistry) -> Result<()> {
        let set = self.language.as_deref().unwrap_or("universal");
        let invalid = |message: String| IpaError::invalid_rule(&self.id, set, message);

        if self.id.trim().is_empty() {
            return Err(invalid("rule id is empty".to_string()));
        }
        self.trigger
            .validate("trigger", false, registry)
            .map_err(invalid)?;
        if let Some(pattern) = &self.preceded_by {
            pattern
                .validate("preceded_by", true, registry)
                .map_err(invalid)?;
        }
        if let Some(pattern) = &self.followed_by {
            pattern
                .validate("followed_by", true, registry)
                .map_err(invalid)?;
        }
        match &self.replace {
            Replacement::Symbol(glyph) => match registry.resolve(glyph, Some(Notation::Ipa)) {
                Ok(resolved) if resolved.placeholder => Err(invalid(
                    "replacement cannot be the placeholder".to_string(),
                )),
                Ok(_) => Ok(()),
                Err(_) => Err(invalid(format!(
                    "replacement symbol '{glyph}' is not in the registry"
                ))),
            },
            Replacement::Diacritic(mark) if !registry.is_diacritic(mark) => Err(invalid(
                format!("replacement diacritic '{mark}' is not known"),
            )),
            Replacement::Diacritic(_) => Ok(()),
        }
    }

    /// One-line summary, e.g. `n -> ŋ / _ [consonant velar]`.
    pub fn describe(&self) -> String {
        let before = self
            .preceded_by
            .as_ref()
            .map(|p| format!("{p} "))
            .unwrap_or_default();
        let after = self
            .followed_by
            .as_ref()
            .map(|p| format!(" {p}"))
            .unwrap_or_default();
        format!("{} -> {} / {before}_{after}", self.trigger, self.replace)
    }
}

#[derive(Debug, Default, Deserialize)]
struct RuleFile {
    #[serde(default)]
    rules: Vec<AllophoneRule>,
}

/// Parse the `[[rules]]` of a TOML document. Nothing is validated here.
pub fn parse_rules(contents: &str) -> Result<Vec<AllophoneRule>> {
    let file: RuleFile = toml::from_str(contents)?;
    Ok(file.rules)
}
