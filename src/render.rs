//! Confidence-driven render mode selection.

use crate::config::RenderConfig;
use crate::defaults::{ALTERNATIVE_SEPARATOR, UNCERTAIN_CLOSE, UNCERTAIN_OPEN};
use crate::types::{LogEntry, Phone, RenderMode};

/// Render mode for an effective confidence.
///
/// Non-finite confidences render as the placeholder.
pub fn render_mode(confidence: f32, config: &RenderConfig) -> RenderMode {
    if confidence >= config.confident_min {
        RenderMode::Confident
    } else if confidence >= config.uncertain_min {
        RenderMode::Uncertain
    } else {
        RenderMode::Placeholder
    }
}

/// A phone with its render decision, before suprasegmental marks.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPhone {
    pub phone: Phone,
    pub mode: RenderMode,
    /// Base glyph plus diacritics, or the placeholder glyph.
    pub symbol: String,
    /// Display text: the symbol, the bracketed guess, or the placeholder.
    pub core: String,
    pub alternatives: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Renderer {
    placeholder: String,
}

impl Renderer {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            placeholder: placeholder.into(),
        }
    }

    pub fn render(&self, phone: &Phone, config: &RenderConfig) -> RenderedPhone {
        let mode = if phone.placeholder {
            RenderMode::Placeholder
        } else {
            render_mode(phone.confidence, config)
        };

        let (symbol, core, alternatives) = match mode {
            RenderMode::Confident => {
                let text = phone.text();
                (text.clone(), text, Vec::new())
            }
            RenderMode::Uncertain => {
                let text = phone.text();
                let alternatives = alternatives(phone, &text, config.max_alternatives);
                let mut core = String::from(UNCERTAIN_OPEN);
                core.push_str(&text);
                for alternative in &alternatives {
                    core.push_str(ALTERNATIVE_SEPARATOR);
                    core.push_str(alternative);
                }
                core.push_str(UNCERTAIN_CLOSE);
                (text, core, alternatives)
            }
            RenderMode::Placeholder => (
                self.placeholder.clone(),
                self.placeholder.clone(),
                Vec::new(),
            ),
        };

        RenderedPhone {
            phone: phone.clone(),
            mode,
            symbol,
            core,
            alternatives,
        }
    }

    /// Render every phone, logging each bracketed or placeholder decision.
    pub fn render_all(
        &self,
        phones: &[Phone],
        config: &RenderConfig,
    ) -> (Vec<RenderedPhone>, Vec<LogEntry>) {
        let mut log = Vec::new();
        let rendered = phones
            .iter()
            .map(|phone| {
                let rendered = self.render(phone, config);
                match rendered.mode {
                    RenderMode::Confident => {}
                    RenderMode::Uncertain => log.push(LogEntry::UncertainRender {
                        segment_id: phone.segment_id,
                        position: phone.index,
                        confidence: phone.confidence,
                        alternatives: rendered.alternatives.len(),
                    }),
                    RenderMode::Placeholder => log.push(LogEntry::PlaceholderRender {
                        segment_id: phone.segment_id,
                        position: phone.index,
                        confidence: phone.confidence,
                    }),
                }
                rendered
            })
            .collect();
        (rendered, log)
    }
}

/// Up to `limit` distinct candidates other than the best guess, most probable first.
fn alternatives(phone: &Phone, best: &str, limit: usize) -> Vec<String> {
    let mut ranked: Vec<_> = phone.candidates.iter().collect();
    ranked.sort_by(|a, b| b.probability.total_cmp(&a.probability));

    let mut picked: Vec<String> = Vec::new();
    for candidate in ranked {
        if picked.len() >= limit {
            break;
        }
        if candidate.symbol != best && !picked.contains(&candidate.symbol) {
            picked.push(candidate.symbol.clone());
        }
    }
    picked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Candidate;
    use std::sync::Arc;

    fn phone(glyph: &str, confidence: f32) -> Phone {
        Phone {
            glyph: glyph.to_string(),
            diacritics: Vec::new(),
            long: false,
            placeholder: false,
            index: 4,
            segment_id: 2,
            utterance_id: Arc::from("u1"),
            start_ms: 0,
            end_ms: 100,
            confidence,
            candidates: Vec::new(),
            rules: Vec::new(),
        }
    }

    fn candidate(symbol: &str, probability: f32) -> Candidate {
        Candidate {
            symbol: symbol.to_string(),
            probability,
        }
    }

    fn renderer() -> Renderer {
        Renderer::new("◯")
    }

    #[test]
    fn test_render_mode_thresholds() {
        let config = RenderConfig::default();
        assert_eq!(render_mode(0.85, &config), RenderMode::Confident);
        assert_eq!(render_mode(0.84, &config), RenderMode::Uncertain);
        assert_eq!(render_mode(0.5, &config), RenderMode::Uncertain);
        assert_eq!(render_mode(0.49, &config), RenderMode::Placeholder);
        assert_eq!(render_mode(f32::NAN, &config), RenderMode::Placeholder);
    }

    #[test]
    fn test_confident_has_no_brackets() {
        let rendered = renderer().render(&phone("k", 0.9), &RenderConfig::default());
        assert_eq!(rendered.core, "k");
        assert!(!rendered.core.contains(UNCERTAIN_OPEN));
    }

    #[test]
    fn test_uncertain_lists_ranked_alternatives() {
        let mut p = phone("k", 0.6);
        p.candidates = vec![
            candidate("k", 0.6),
            candidate("x", 0.05),
            candidate("ɡ", 0.3),
            candidate("q", 0.05),
        ];
        let config = RenderConfig {
            max_alternatives: 2,
            ..RenderConfig::default()
        };

        let rendered = renderer().render(&p, &config);

        assert_eq!(rendered.mode, RenderMode::Uncertain);
        assert_eq!(rendered.core, "(k|ɡ|x)");
        assert_eq!(rendered.alternatives, vec!["ɡ".to_string(), "x".to_string()]);
        assert_eq!(rendered.symbol, "k");
    }

    #[test]
    fn test_uncertain_without_candidates() {
        let rendered = renderer().render(&phone("k", 0.6), &RenderConfig::default());
        assert_eq!(rendered.core, "(k)");
    }

    #[test]
    fn test_low_confidence_is_placeholder_never_guess() {
        let mut p = phone("k", 0.2);
        p.candidates = vec![candidate("ɡ", 0.9)];
        let rendered = renderer().render(&p, &RenderConfig::default());
        assert_eq!(rendered.mode, RenderMode::Placeholder);
        assert_eq!(rendered.core, "◯");
        assert!(rendered.alternatives.is_empty());
    }

    #[test]
    fn test_placeholder_phone_ignores_confidence() {
        let mut p = phone("◯", 1.0);
        p.placeholder = true;
        let rendered = renderer().render(&p, &RenderConfig::default());
        assert_eq!(rendered.mode, RenderMode::Placeholder);
    }

    #[test]
    fn test_render_all_logs_decisions() {
        let phones = vec![phone("a", 0.95), phone("b", 0.6), phone("c", 0.1)];
        let (rendered, log) = renderer().render_all(&phones, &RenderConfig::default());
        assert_eq!(rendered.len(), 3);
        let kinds: Vec<&str> = log.iter().map(LogEntry::kind_name).collect();
        assert_eq!(kinds, vec!["uncertain_render", "placeholder_render"]);
    }

    #[test]
    fn test_threshold_property_over_range() {
        let config = RenderConfig::default();
        for step in 0..=100 {
            let confidence = step as f32 / 100.0;
            let rendered = renderer().render(&phone("t", confidence), &config);
            if confidence < config.uncertain_min {
                assert_eq!(rendered.core, "◯");
            }
            if confidence >= config.confident_min {
                assert!(!rendered.core.contains('('));
            }
        }
    }
}
