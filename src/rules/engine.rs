//! Tiered application of allophone rules.

use super::builtin::builtin_rules;
use super::rule::{AllophoneRule, Replacement, parse_rules};
use crate::config::RulesConfig;
use crate::error::Result;
use crate::language;
use crate::registry::{DiacriticEffect, Notation, SymbolRegistry};
use crate::types::{LogEntry, Phone};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Name reported for the rule set used when a language has none.
pub const UNIVERSAL: &str = "universal";

/// A rule set that failed validation and was dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleLoadError {
    pub rule_set: String,
    pub message: String,
}

#[derive(Debug)]
pub struct RuleEngine {
    registry: Arc<SymbolRegistry>,
    universal: Vec<AllophoneRule>,
    sets: BTreeMap<String, Vec<AllophoneRule>>,
    rejected: BTreeSet<String>,
    load_errors: Vec<RuleLoadError>,
}

impl RuleEngine {
    /// Engine with no rules at all.
    pub fn new(registry: Arc<SymbolRegistry>) -> Self {
        Self {
            registry,
            universal: Vec::new(),
            sets: BTreeMap::new(),
            rejected: BTreeSet::new(),
            load_errors: Vec::new(),
        }
    }

    /// Engine loaded with the built-in rule sets.
    pub fn builtin(registry: Arc<SymbolRegistry>) -> Self {
        let mut engine = Self::new(registry);
        engine.add_rules(builtin_rules());
        engine
    }

    /// Build from configuration: built-ins (if enabled) plus an optional rule file.
    ///
    /// An unreadable or unparseable rule file is an error. Individual invalid
    /// rules only disable their own rule set.
    pub fn from_config(registry: Arc<SymbolRegistry>, config: &RulesConfig) -> Result<Self> {
        let mut engine = if config.builtin {
            Self::builtin(registry)
        } else {
            Self::new(registry)
        };
        if let Some(path) = &config.path {
            engine.load_file(path)?;
        }
        Ok(engine)
    }

    /// Layer the rules of a TOML file onto the engine.
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let contents = fs::read_to_string(path)?;
        let rules = parse_rules(&contents)?;
        tracing::debug!("Loaded {} rules from {}", rules.len(), path.display());
        self.add_rules(rules);
        Ok(())
    }

    /// Add rules, grouped by their rule set.
    ///
    /// If any rule of a set is invalid, the whole set is dropped and recorded
    /// in [`load_errors`](Self::load_errors); that language then falls back to
    /// the universal rules.
    pub fn add_rules(&mut self, rules: Vec<AllophoneRule>) {
        let mut groups: BTreeMap<Option<String>, Vec<AllophoneRule>> = BTreeMap::new();
        for mut rule in rules {
            let set = rule.language.as_deref().map(|l| language::normalize(Some(l)));
            rule.language = set.clone();
            groups.entry(set).or_default().push(rule);
        }

        for (set, rules) in groups {
            let name = set.clone().unwrap_or_else(|| UNIVERSAL.to_string());
            if self.rejected.contains(&name) {
                continue;
            }
            let existing = match &set {
                Some(set) => self.sets.get(set).map(Vec::as_slice).unwrap_or_default(),
                None => self.universal.as_slice(),
            };
            if let Err(message) = self.check(existing, &rules) {
                tracing::warn!("Rule set '{name}' rejected, using universal rules: {message}");
                self.load_errors.push(RuleLoadError {
                    rule_set: name.clone(),
                    message,
                });
                self.rejected.insert(name);
                if let Some(set) = set {
                    self.sets.remove(&set);
                }
                continue;
            }

            let target = match set {
                Some(set) => self.sets.entry(set).or_default(),
                None => &mut self.universal,
            };
            target.extend(rules);
            // Stable: equal priorities keep declaration order.
            target.sort_by_key(|r| r.priority);
        }
    }

    fn check(
        &self,
        existing: &[AllophoneRule],
        rules: &[AllophoneRule],
    ) -> std::result::Result<(), String> {
        let mut ids: BTreeSet<&str> = existing.iter().map(|r| r.id.as_str()).collect();
        for rule in rules {
            rule.validate(&self.registry).map_err(|e| e.to_string())?;
            if !ids.insert(rule.id.as_str()) {
                return Err(format!("duplicate rule id '{}'", rule.id));
            }
        }
        Ok(())
    }

    pub fn load_errors(&self) -> &[RuleLoadError] {
        &self.load_errors
    }

    /// Names of the loaded language rule sets.
    pub fn rule_sets(&self) -> Vec<&str> {
        self.sets.keys().map(String::as_str).collect()
    }

    /// Rule set used for a language, with its name.
    ///
    /// An explicit `rule_set` wins when it exists; otherwise the language's
    /// fallback chain is searched; otherwise the universal set applies.
    pub fn select(&self, language: &str, rule_set: Option<&str>) -> (&str, &[AllophoneRule]) {
        let explicit = rule_set.map(|s| language::normalize(Some(s)));
        let chain = explicit
            .into_iter()
            .chain(language::fallback_chain(&language::normalize(Some(language))));
        for name in chain {
            if let Some((key, rules)) = self.sets.get_key_value(&name) {
                return (key.as_str(), rules.as_slice());
            }
        }
        (UNIVERSAL, self.universal.as_slice())
    }

    /// Rewrite a phone stream, one frozen snapshot per priority tier.
    ///
    /// Within a tier the first matching rule (in declaration order) fires at
    /// each position and sees only the output of earlier tiers.
    pub fn apply(
        &self,
        phones: &[Phone],
        language: &str,
        rule_set: Option<&str>,
    ) -> (Vec<Phone>, Vec<LogEntry>) {
        let (name, rules) = self.select(language, rule_set);
        let mut current = phones.to_vec();
        let mut log = Vec::new();

        for tier in rules.chunk_by(|a, b| a.priority == b.priority) {
            let snapshot = current.clone();
            for index in 0..snapshot.len() {
                let Some(rule) = tier
                    .iter()
                    .find(|r| r.matches_at(&snapshot, index, &self.registry))
                else {
                    continue;
                };
                let original = &snapshot[index];
                let phone = &mut current[index];
                if !self.rewrite(phone, &rule.replace) {
                    continue;
                }
                phone.rules.push(rule.id.clone());
                log.push(LogEntry::RuleApplied {
                    segment_id: original.segment_id,
                    position: original.index,
                    original: original.text(),
                    rule_id: rule.id.clone(),
                    replacement: phone.text(),
                });
            }
        }

        tracing::debug!(
            "Rule set '{name}' applied {} rewrites over {} phones",
            log.len(),
            phones.len()
        );
        (current, log)
    }

    /// Apply a replacement. Returns false when nothing changed.
    fn rewrite(&self, phone: &mut Phone, replacement: &Replacement) -> bool {
        match replacement {
            Replacement::Symbol(glyph) => {
                let Ok(resolved) = self.registry.resolve(glyph, Some(Notation::Ipa)) else {
                    return false;
                };
                let long = phone.long || resolved.long;
                if phone.glyph == resolved.glyph
                    && phone.diacritics == resolved.diacritics
                    && phone.long == long
                {
                    return false;
                }
                phone.glyph = resolved.glyph;
                phone.diacritics = resolved.diacritics;
                phone.long = long;
                true
            }
            Replacement::Diacritic(mark) => {
                let is_length = self.registry.diacritic(mark).is_some_and(|d| {
                    matches!(d.effect, DiacriticEffect::Long | DiacriticEffect::HalfLong)
                });
                if is_length {
                    let changed = !phone.long;
                    phone.long = true;
                    changed
                } else if phone.diacritics.contains(mark) {
                    false
                } else {
                    phone.diacritics.push(mark.clone());
                    true
                }
            }
        }
    }
}
