//! End-to-end processing of one utterance.
//!
//! resolve / map -> allophone rules -> suprasegmentals -> render -> assemble

use crate::assembler;
use crate::config::Config;
use crate::error::Result;
use crate::language;
use crate::mapping::{ClusterMapper, JsonFileStore, MappingService};
use crate::prosody::{Annotator, SegmentProsody};
use crate::registry::{Notation, Resolved, SymbolRegistry};
use crate::render::Renderer;
use crate::rules::RuleEngine;
use crate::types::{AnnotatedTranscript, Candidate, LogEntry, Phone, PhoneToken, Utterance};
use std::collections::HashMap;
use std::sync::Arc;

/// The post-processing engine. Shared across worker threads by reference.
#[derive(Debug)]
pub struct Engine {
    config: Config,
    registry: Arc<SymbolRegistry>,
    rules: RuleEngine,
    mapper: ClusterMapper,
    annotator: Annotator,
    renderer: Renderer,
}

impl Engine {
    pub fn new(
        config: Config,
        registry: Arc<SymbolRegistry>,
        rules: RuleEngine,
        mappings: Arc<MappingService>,
    ) -> Self {
        let renderer = Renderer::new(registry.placeholder().glyph.clone());
        Self {
            mapper: ClusterMapper::new(Arc::clone(&registry), mappings),
            annotator: Annotator::new(Arc::clone(&registry)),
            renderer,
            config,
            registry,
            rules,
        }
    }

    /// Build every component from configuration.
    ///
    /// Mapping tables persist under `mapping.store_dir` when set and live only
    /// in memory otherwise.
    pub fn from_config(config: Config) -> Result<Self> {
        let registry = Arc::new(match &config.registry.inventory {
            Some(path) => SymbolRegistry::load(path)?,
            None => SymbolRegistry::builtin()?,
        });
        let rules = RuleEngine::from_config(Arc::clone(&registry), &config.rules)?;
        let mappings = Arc::new(match &config.mapping.store_dir {
            Some(dir) => MappingService::new(Box::new(JsonFileStore::new(dir))),
            None => MappingService::in_memory(),
        });
        tracing::debug!(
            "Engine ready: {} symbols, rule sets {:?}",
            registry.len(),
            rules.rule_sets()
        );
        Ok(Self::new(config, registry, rules, mappings))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Arc<SymbolRegistry> {
        &self.registry
    }

    pub fn rules(&self) -> &RuleEngine {
        &self.rules
    }

    pub fn mapper(&self) -> &ClusterMapper {
        &self.mapper
    }

    /// Language an utterance is processed under.
    pub fn language_of(&self, utterance: &Utterance) -> String {
        let hint = utterance
            .language
            .as_deref()
            .unwrap_or(&self.config.default_language);
        language::normalize(Some(hint))
    }

    /// Relabel a cluster; visible to every later lookup for that language.
    pub fn relabel(
        &self,
        cluster_id: &str,
        language: &str,
        symbol: &str,
        notation: Option<Notation>,
    ) -> Result<Resolved> {
        self.mapper.relabel(cluster_id, language, symbol, notation)
    }

    /// Turn one utterance into its annotated transcript.
    ///
    /// Lexical and mapping gaps degrade to placeholders and log entries; only
    /// an unusable language profile is an error.
    pub fn process(&self, utterance: &Utterance) -> Result<AnnotatedTranscript> {
        let language = self.language_of(utterance);
        let profile = self.config.profile(&language)?;
        let utterance_id: Arc<str> = Arc::from(utterance.utterance_id.as_str());

        let mut phones: Vec<Phone> = Vec::new();
        let mut segments: Vec<SegmentProsody<'_>> = Vec::with_capacity(utterance.segments.len());
        let mut log: Vec<LogEntry> = Vec::new();

        for segment in &utterance.segments {
            // Phones keep their segment's utterance so rule context never crosses it.
            let segment_utterance = if segment.utterance_id.is_empty()
                || segment.utterance_id == utterance.utterance_id
            {
                Arc::clone(&utterance_id)
            } else {
                tracing::warn!(
                    "Segment {} belongs to utterance {}, not {}",
                    segment.segment_id,
                    segment.utterance_id,
                    utterance.utterance_id
                );
                Arc::from(segment.utterance_id.as_str())
            };
            segments.push(SegmentProsody {
                segment_id: segment.segment_id,
                offset: phones.len(),
                len: segment.tokens.len(),
                samples: &segment.prosody,
                syllables: &segment.syllables,
            });
            for token in &segment.tokens {
                let index = phones.len();
                let notation = token.notation.or(utterance.notation);
                let (resolved, confidence) = self.resolve_token(
                    token,
                    segment.segment_id,
                    index,
                    &language,
                    profile.mapping.distance_threshold,
                    notation,
                    &mut log,
                );
                phones.push(Phone {
                    glyph: resolved.glyph,
                    diacritics: resolved.diacritics,
                    long: resolved.long,
                    placeholder: resolved.placeholder,
                    index,
                    segment_id: segment.segment_id,
                    utterance_id: Arc::clone(&segment_utterance),
                    start_ms: token.start_ms,
                    end_ms: token.end_ms,
                    confidence,
                    candidates: self.resolve_candidates(token, notation),
                    rules: Vec::new(),
                });
            }
        }

        let (phones, rule_log) = self
            .rules
            .apply(&phones, &language, profile.rule_set.as_deref());
        log.extend(rule_log);

        let annotation = self.annotator.annotate(&phones, &segments, &profile);
        log.extend(annotation.log);

        let (rendered, render_log) = self.renderer.render_all(&phones, &profile.render);
        log.extend(render_log);

        // Stage order within each segment, segments in input order.
        let order: HashMap<u64, usize> = utterance
            .segments
            .iter()
            .enumerate()
            .rev()
            .map(|(position, s)| (s.segment_id, position))
            .collect();
        log.sort_by_key(|entry| {
            order
                .get(&entry.segment_id())
                .copied()
                .unwrap_or(usize::MAX)
        });

        let (glyphs, assembly_log) =
            assembler::assemble(rendered, &annotation.events, &profile.assembly);
        log.extend(assembly_log);

        tracing::debug!(
            "Utterance {} ({language}): {} tokens -> {} glyphs, {} log entries",
            utterance.utterance_id,
            phones.len(),
            glyphs.len(),
            log.len()
        );

        Ok(AnnotatedTranscript {
            utterance_id: utterance.utterance_id.clone(),
            language,
            glyphs,
            events: annotation.events,
            log,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn resolve_token(
        &self,
        token: &PhoneToken,
        segment_id: u64,
        position: usize,
        language: &str,
        distance_threshold: f32,
        notation: Option<Notation>,
        log: &mut Vec<LogEntry>,
    ) -> (Resolved, f32) {
        let confidence = token.confidence.clamp(0.0, 1.0);

        if let Some(cluster_id) = &token.cluster_id {
            let found = self.mapper.map(
                cluster_id,
                language,
                token.features.as_ref(),
                distance_threshold,
            );
            log.push(LogEntry::ClusterMapped {
                segment_id,
                position,
                cluster_id: cluster_id.clone(),
                partition: found.partition,
                glyph: found.resolved.text(),
                penalty: found.penalty,
            });
            return (found.resolved, confidence * (1.0 - found.penalty));
        }

        let symbol = token.symbol.as_deref().unwrap_or_default();
        match self.registry.resolve(symbol, notation) {
            Ok(resolved) => (resolved, confidence),
            Err(e) => {
                tracing::debug!("Segment {segment_id} position {position}: {e}");
                log.push(LogEntry::UnknownSymbol {
                    segment_id,
                    position,
                    symbol: symbol.to_string(),
                });
                (self.placeholder(), confidence)
            }
        }
    }

    /// Upstream candidates in canonical IPA; unknown ones are dropped.
    fn resolve_candidates(
        &self,
        token: &PhoneToken,
        notation: Option<Notation>,
    ) -> Vec<Candidate> {
        token
            .candidates
            .iter()
            .filter_map(|c| {
                let resolved = self.registry.resolve(&c.symbol, notation).ok()?;
                (!resolved.placeholder).then(|| Candidate {
                    symbol: resolved.text(),
                    probability: c.probability,
                })
            })
            .collect()
    }

    fn placeholder(&self) -> Resolved {
        Resolved {
            glyph: self.registry.placeholder().glyph.clone(),
            diacritics: Vec::new(),
            long: false,
            placeholder: true,
        }
    }
}
