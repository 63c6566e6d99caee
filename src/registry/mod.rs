//! Canonical IPA inventory with bidirectional X-SAMPA / ARPABET aliases.
//!
//! The registry is loaded once and shared read-only (`Arc<SymbolRegistry>`).
//! Every glyph has exactly one entry and every alias resolves to exactly one
//! glyph within its notation; both are checked when the registry is built.

pub mod features;
pub mod inventory;

use crate::error::{IpaError, Result};
use features::{FeatureVector, Features, SecondaryArticulation};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::Path;

/// Phonetic notation a symbol is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Notation {
    Ipa,
    XSampa,
    Arpabet,
}

impl Notation {
    /// Lookup order when a token does not name its notation.
    pub const ALL: [Notation; 3] = [Notation::Ipa, Notation::XSampa, Notation::Arpabet];

    pub fn as_str(&self) -> &'static str {
        match self {
            Notation::Ipa => "ipa",
            Notation::XSampa => "x-sampa",
            Notation::Arpabet => "arpabet",
        }
    }
}

impl fmt::Display for Notation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Notation {
    type Err = IpaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ipa" => Ok(Notation::Ipa),
            "x-sampa" | "xsampa" => Ok(Notation::XSampa),
            "arpabet" => Ok(Notation::Arpabet),
            other => Err(IpaError::invalid_value(
                "notation",
                format!("'{other}' is not one of ipa, x-sampa, arpabet"),
            )),
        }
    }
}

/// One canonical IPA glyph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolEntry {
    pub glyph: String,
    /// Non-IPA spellings, one per notation. IPA is the glyph itself.
    #[serde(default)]
    pub aliases: BTreeMap<Notation, String>,
    #[serde(default)]
    pub features: Features,
    #[serde(default)]
    pub placeholder: bool,
}

impl SymbolEntry {
    /// Spelling of this entry in `notation`, if it has one.
    pub fn alias(&self, notation: Notation) -> Option<&str> {
        match notation {
            Notation::Ipa => Some(&self.glyph),
            other => self.aliases.get(&other).map(String::as_str),
        }
    }
}

/// What a diacritic does to the segment it attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiacriticEffect {
    Aspirated,
    Nasalized,
    Devoiced,
    Syllabic,
    Unreleased,
    Dental,
    Ejective,
    Secondary(SecondaryArticulation),
    Long,
    HalfLong,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diacritic {
    pub mark: String,
    pub xsampa: String,
    pub effect: DiacriticEffect,
}

impl Diacritic {
    fn spelling(&self, notation: Notation) -> Option<&str> {
        match notation {
            Notation::Ipa => Some(&self.mark),
            Notation::XSampa => Some(&self.xsampa),
            Notation::Arpabet => None,
        }
    }

    fn is_length(&self) -> bool {
        matches!(self.effect, DiacriticEffect::Long | DiacriticEffect::HalfLong)
    }
}

/// A symbol resolved to its canonical base glyph plus IPA diacritics.
///
/// Length marks are lifted out into `long` so that suprasegmental length is
/// only ever rendered once.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub glyph: String,
    pub diacritics: Vec<String>,
    pub long: bool,
    pub placeholder: bool,
}

impl Resolved {
    /// Base glyph followed by its diacritics.
    pub fn text(&self) -> String {
        let mut text = self.glyph.clone();
        for mark in &self.diacritics {
            text.push_str(mark);
        }
        text
    }
}

#[derive(Debug, Deserialize)]
struct InventoryFile {
    #[serde(default)]
    symbols: Vec<SymbolEntry>,
}

#[derive(Debug)]
pub struct SymbolRegistry {
    entries: Vec<SymbolEntry>,
    by_glyph: HashMap<String, usize>,
    by_alias: HashMap<(Notation, String), usize>,
    diacritics: Vec<Diacritic>,
    placeholder: usize,
}

impl SymbolRegistry {
    /// Registry over the built-in inventory.
    pub fn builtin() -> Result<Self> {
        Self::new(inventory::builtin_symbols(), inventory::builtin_diacritics())
    }

    /// Build a registry, enforcing glyph and alias uniqueness.
    ///
    /// The first placeholder entry becomes the designated fallback; if none is
    /// given the built-in placeholder is appended.
    pub fn new(mut entries: Vec<SymbolEntry>, diacritics: Vec<Diacritic>) -> Result<Self> {
        if !entries.iter().any(|e| e.placeholder) {
            entries.push(inventory::placeholder());
        }

        let mut by_glyph = HashMap::new();
        let mut by_alias: HashMap<(Notation, String), usize> = HashMap::new();
        let mut placeholder = None;

        for (index, entry) in entries.iter().enumerate() {
            if by_glyph.insert(entry.glyph.clone(), index).is_some() {
                return Err(IpaError::DuplicateSymbol {
                    glyph: entry.glyph.clone(),
                });
            }
            for (&notation, alias) in &entry.aliases {
                if notation == Notation::Ipa {
                    continue;
                }
                let key = (notation, alias_key(notation, alias));
                if let Some(&previous) = by_alias.get(&key) {
                    return Err(IpaError::AmbiguousAlias {
                        alias: alias.clone(),
                        notation: notation.to_string(),
                        first: entries[previous].glyph.clone(),
                        second: entry.glyph.clone(),
                    });
                }
                by_alias.insert(key, index);
            }
            if entry.placeholder && placeholder.is_none() {
                placeholder = Some(index);
            }
        }

        let placeholder = placeholder
            .ok_or_else(|| IpaError::Other("registry has no placeholder entry".to_string()))?;

        Ok(Self {
            entries,
            by_glyph,
            by_alias,
            diacritics,
            placeholder,
        })
    }

    /// Built-in inventory extended with the `[[symbols]]` of a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: InventoryFile = toml::from_str(contents)?;
        let mut entries = inventory::builtin_symbols();
        entries.extend(file.symbols);
        Self::new(entries, inventory::builtin_diacritics())
    }

    /// Load an inventory extension file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn entries(&self) -> &[SymbolEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The designated fallback entry.
    pub fn placeholder(&self) -> &SymbolEntry {
        &self.entries[self.placeholder]
    }

    /// Canonical entry for an IPA glyph.
    pub fn entry(&self, glyph: &str) -> Option<&SymbolEntry> {
        self.by_glyph.get(glyph).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, glyph: &str) -> bool {
        self.by_glyph.contains_key(glyph)
    }

    /// Aliases of a canonical glyph.
    pub fn aliases(&self, glyph: &str) -> Option<&BTreeMap<Notation, String>> {
        self.entry(glyph).map(|e| &e.aliases)
    }

    pub fn is_diacritic(&self, mark: &str) -> bool {
        self.diacritic(mark).is_some()
    }

    pub fn diacritic(&self, mark: &str) -> Option<&Diacritic> {
        self.diacritics.iter().find(|d| d.mark == mark)
    }

    /// Resolve a symbol to its canonical entry (exact spelling only).
    pub fn lookup(&self, symbol: &str, notation: Notation) -> Result<&SymbolEntry> {
        self.exact(symbol, notation)
            .map(|i| &self.entries[i])
            .ok_or_else(|| IpaError::unknown_symbol(symbol, notation.as_str()))
    }

    /// Resolve a symbol, allowing trailing diacritics after a known base.
    ///
    /// With no notation, IPA, X-SAMPA and ARPABET are tried in that order.
    pub fn resolve(&self, symbol: &str, notation: Option<Notation>) -> Result<Resolved> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(IpaError::unknown_symbol(symbol, "any"));
        }
        match notation {
            Some(notation) => self
                .resolve_in(symbol, notation)
                .ok_or_else(|| IpaError::unknown_symbol(symbol, notation.as_str())),
            None => Notation::ALL
                .iter()
                .find_map(|&n| self.resolve_in(symbol, n))
                .ok_or_else(|| IpaError::unknown_symbol(symbol, "any")),
        }
    }

    fn exact(&self, symbol: &str, notation: Notation) -> Option<usize> {
        match notation {
            Notation::Ipa => self.by_glyph.get(symbol).copied(),
            Notation::XSampa => self
                .by_alias
                .get(&(notation, symbol.to_string()))
                .copied(),
            Notation::Arpabet => {
                let key = alias_key(notation, symbol);
                self.by_alias
                    .get(&(notation, key.clone()))
                    .or_else(|| {
                        // Stress digits (AH0, IY1) do not change the segment.
                        let stripped = key.trim_end_matches(|c: char| c.is_ascii_digit());
                        self.by_alias.get(&(notation, stripped.to_string()))
                    })
                    .copied()
            }
        }
    }

    fn resolve_in(&self, symbol: &str, notation: Notation) -> Option<Resolved> {
        if let Some(index) = self.exact(symbol, notation) {
            return Some(self.resolved(index, Vec::new()));
        }
        if notation == Notation::Arpabet {
            return None;
        }

        // Longest known base first, then the remainder must be all diacritics.
        let mut cuts: Vec<usize> = symbol.char_indices().map(|(i, _)| i).skip(1).collect();
        cuts.reverse();
        for cut in cuts {
            let Some(index) = self.exact(&symbol[..cut], notation) else {
                continue;
            };
            if let Some(marks) = self.split_diacritics(&symbol[cut..], notation) {
                return Some(self.resolved(index, marks));
            }
        }
        None
    }

    fn split_diacritics(&self, mut rest: &str, notation: Notation) -> Option<Vec<&Diacritic>> {
        let mut marks = Vec::new();
        while !rest.is_empty() {
            let best = self
                .diacritics
                .iter()
                .filter_map(|d| d.spelling(notation).map(|s| (d, s)))
                .filter(|(_, s)| !s.is_empty() && rest.starts_with(s))
                .max_by_key(|(_, s)| s.len())?;
            marks.push(best.0);
            rest = &rest[best.1.len()..];
        }
        Some(marks)
    }

    fn resolved(&self, index: usize, marks: Vec<&Diacritic>) -> Resolved {
        let entry = &self.entries[index];
        let long = marks.iter().any(|d| d.is_length());
        let mut diacritics: Vec<String> = Vec::new();
        for mark in marks.iter().filter(|d| !d.is_length()) {
            if !diacritics.contains(&mark.mark) {
                diacritics.push(mark.mark.clone());
            }
        }
        Resolved {
            glyph: entry.glyph.clone(),
            diacritics,
            long,
            placeholder: entry.placeholder,
        }
    }

    /// Features of a base glyph after applying diacritics.
    ///
    /// Unknown glyphs yield placeholder features.
    pub fn features_of(&self, glyph: &str, diacritics: &[String]) -> Features {
        let mut features = self
            .entry(glyph)
            .map(|e| e.features.clone())
            .unwrap_or_default();
        for mark in diacritics {
            match self.diacritic(mark).map(|d| d.effect) {
                Some(DiacriticEffect::Nasalized) => features.nasalized = true,
                Some(DiacriticEffect::Devoiced) => features.voiced = false,
                Some(DiacriticEffect::Secondary(secondary)) => {
                    features.secondary = Some(secondary)
                }
                _ => {}
            }
        }
        features
    }

    /// Closest candidate to `target`; ties go to the earliest candidate.
    pub fn nearest<'a>(
        &self,
        target: &FeatureVector,
        candidates: impl IntoIterator<Item = &'a SymbolEntry>,
    ) -> Option<(&'a SymbolEntry, f32)> {
        let mut best: Option<(&SymbolEntry, f32)> = None;
        for candidate in candidates {
            let Some(vector) = candidate.features.vector() else {
                continue;
            };
            let distance = target.distance(&vector);
            if best.is_none_or(|(_, d)| distance < d) {
                best = Some((candidate, distance));
            }
        }
        best
    }

    /// Closest non-placeholder entry in the whole inventory.
    pub fn nearest_known(&self, target: &FeatureVector) -> Option<(&SymbolEntry, f32)> {
        self.nearest(target, self.entries.iter().filter(|e| !e.placeholder))
    }
}

fn alias_key(notation: Notation, alias: &str) -> String {
    match notation {
        Notation::Arpabet => alias.to_uppercase(),
        _ => alias.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::features::{Manner, Place, SegmentKind};

    fn registry() -> SymbolRegistry {
        SymbolRegistry::builtin().unwrap()
    }

    #[test]
    fn test_builtin_registry_builds() {
        let registry = registry();
        assert!(registry.len() > 100);
        assert!(registry.placeholder().placeholder);
    }

    #[test]
    fn test_aliases_round_trip_across_notations() {
        let registry = registry();
        for entry in registry.entries() {
            for (&notation, alias) in &entry.aliases {
                let resolved = registry.resolve(alias, Some(notation)).unwrap();
                assert_eq!(
                    resolved.glyph, entry.glyph,
                    "{notation} alias {alias} did not round-trip"
                );
                assert!(resolved.diacritics.is_empty());
            }
        }
    }

    #[test]
    fn test_resolve_xsampa() {
        let resolved = registry().resolve("N", Some(Notation::XSampa)).unwrap();
        assert_eq!(resolved.glyph, "ŋ");
    }

    #[test]
    fn test_resolve_arpabet_ignores_case_and_stress() {
        let registry = registry();
        assert_eq!(registry.resolve("ng", Some(Notation::Arpabet)).unwrap().glyph, "ŋ");
        assert_eq!(registry.resolve("AH0", Some(Notation::Arpabet)).unwrap().glyph, "ʌ");
        assert_eq!(registry.resolve("ER1", Some(Notation::Arpabet)).unwrap().glyph, "ɝ");
    }

    #[test]
    fn test_resolve_without_notation_prefers_ipa() {
        let registry = registry();
        assert_eq!(registry.resolve("ʃ", None).unwrap().glyph, "ʃ");
        assert_eq!(registry.resolve("S", None).unwrap().glyph, "ʃ");
        assert_eq!(registry.resolve("HH", None).unwrap().glyph, "h");
    }

    #[test]
    fn test_resolve_composite_ipa() {
        let resolved = registry().resolve("tʰ", Some(Notation::Ipa)).unwrap();
        assert_eq!(resolved.glyph, "t");
        assert_eq!(resolved.diacritics, vec!["ʰ".to_string()]);
        assert_eq!(resolved.text(), "tʰ");
    }

    #[test]
    fn test_resolve_composite_xsampa() {
        let resolved = registry().resolve("k_w", Some(Notation::XSampa)).unwrap();
        assert_eq!(resolved.text(), "kʷ");
    }

    #[test]
    fn test_resolve_lifts_length_mark() {
        let resolved = registry().resolve("aː", Some(Notation::Ipa)).unwrap();
        assert_eq!(resolved.glyph, "a");
        assert!(resolved.diacritics.is_empty());
        assert!(resolved.long);

        let xsampa = registry().resolve("a:", Some(Notation::XSampa)).unwrap();
        assert!(xsampa.long);
    }

    #[test]
    fn test_resolve_prefers_precomposed_entry() {
        let resolved = registry().resolve("a~", Some(Notation::XSampa)).unwrap();
        assert_eq!(resolved.glyph, "a\u{303}");
        assert!(resolved.diacritics.is_empty());
    }

    #[test]
    fn test_unknown_symbol_is_error() {
        let error = registry().resolve("☃", None).unwrap_err();
        assert!(matches!(error, IpaError::UnknownSymbol { .. }));
    }

    #[test]
    fn test_unknown_trailing_material_is_error() {
        assert!(registry().resolve("tQQ", Some(Notation::Ipa)).is_err());
    }

    #[test]
    fn test_empty_symbol_is_error() {
        assert!(registry().resolve("  ", None).is_err());
    }

    #[test]
    fn test_features_of_applies_diacritics() {
        let registry = registry();
        let features = registry.features_of("a", &["\u{303}".to_string()]);
        assert!(features.nasalized);
        let features = registry.features_of("k", &["ʷ".to_string()]);
        assert_eq!(features.secondary, Some(SecondaryArticulation::Labialized));
        let features = registry.features_of("d", &["\u{325}".to_string()]);
        assert!(!features.voiced);
    }

    #[test]
    fn test_nearest_known_finds_exact_match() {
        let registry = registry();
        let target = Features::consonant(Place::Velar, Manner::Nasal, true)
            .vector()
            .unwrap();
        let (entry, distance) = registry.nearest_known(&target).unwrap();
        assert_eq!(entry.glyph, "ŋ");
        assert_eq!(distance, 0.0);
    }

    #[test]
    fn test_duplicate_glyph_rejected() {
        let mut symbols = inventory::builtin_symbols();
        symbols.push(symbols[0].clone());
        let error = SymbolRegistry::new(symbols, inventory::builtin_diacritics()).unwrap_err();
        assert!(matches!(error, IpaError::DuplicateSymbol { .. }));
    }

    #[test]
    fn test_ambiguous_alias_rejected() {
        let error = SymbolRegistry::from_toml_str(
            r#"
                [[symbols]]
                glyph = "ʈʰ"
                aliases = { x-sampa = "t" }
                features = { kind = "consonant", place = "retroflex", manner = "plosive" }
            "#,
        )
        .unwrap_err();
        assert!(matches!(error, IpaError::AmbiguousAlias { .. }));
    }

    #[test]
    fn test_toml_extension_adds_symbol() {
        let registry = SymbolRegistry::from_toml_str(
            r#"
                [[symbols]]
                glyph = "ǀ"
                aliases = { x-sampa = "|\\" }
                features = { kind = "consonant", place = "dental", manner = "plosive" }
            "#,
        )
        .unwrap();
        let entry = registry.lookup("|\\", Notation::XSampa).unwrap();
        assert_eq!(entry.glyph, "ǀ");
        assert_eq!(entry.features.kind, SegmentKind::Consonant);
    }

    #[test]
    fn test_missing_placeholder_is_added() {
        let symbols: Vec<SymbolEntry> = inventory::builtin_symbols()
            .into_iter()
            .filter(|s| !s.placeholder)
            .collect();
        let registry = SymbolRegistry::new(symbols, inventory::builtin_diacritics()).unwrap();
        assert_eq!(registry.placeholder().glyph, crate::defaults::PLACEHOLDER_GLYPH);
    }

    #[test]
    fn test_notation_from_str() {
        assert_eq!("X-SAMPA".parse::<Notation>().unwrap(), Notation::XSampa);
        assert_eq!("arpabet".parse::<Notation>().unwrap(), Notation::Arpabet);
        assert!("klingon".parse::<Notation>().is_err());
    }
}
