//! Terminal rendering of transcripts, log entries and registry lookups.
//!
//! Formatting functions return strings so the CLI decides where they go.

use crate::registry::features::Features;
use crate::registry::{Resolved, SymbolEntry};
use crate::rules::AllophoneRule;
use crate::types::{AnnotatedTranscript, LogEntry, RenderMode, RenderedGlyph};
use owo_colors::OwoColorize;
use serde::Serialize;

/// Glyph text colored by how it was rendered.
fn paint(glyph: &RenderedGlyph, color: bool) -> String {
    if !color {
        return glyph.text.clone();
    }
    match glyph.mode {
        RenderMode::Confident => glyph.text.green().to_string(),
        RenderMode::Uncertain => glyph.text.yellow().to_string(),
        RenderMode::Placeholder => glyph.text.red().dimmed().to_string(),
    }
}

fn paint_ipa<'a>(glyphs: impl Iterator<Item = &'a RenderedGlyph>, color: bool) -> String {
    glyphs.map(|g| paint(g, color)).collect()
}

/// Per-kind counts, in first-seen kind order.
fn log_counts(log: &[LogEntry]) -> Vec<(&'static str, usize)> {
    let mut counts: Vec<(&'static str, usize)> = Vec::new();
    for entry in log {
        match counts.iter_mut().find(|(kind, _)| *kind == entry.kind_name()) {
            Some((_, count)) => *count += 1,
            None => counts.push((entry.kind_name(), 1)),
        }
    }
    counts
}

/// Multi-line summary of one transcript.
///
/// `verbose >= 1` lists every log entry below the summary.
pub fn format_transcript(
    transcript: &AnnotatedTranscript,
    by_segment: bool,
    verbose: u8,
    color: bool,
) -> String {
    let mut lines: Vec<String> = Vec::new();
    let header = format!("{} [{}]", transcript.utterance_id, transcript.language);
    lines.push(if color {
        header.bold().to_string()
    } else {
        header
    });

    if by_segment {
        for segment_id in transcript.segment_ids() {
            let glyphs = transcript
                .glyphs
                .iter()
                .filter(|g| g.segment_id == segment_id);
            lines.push(format!("  #{segment_id:<4} {}", paint_ipa(glyphs, color)));
        }
    } else {
        lines.push(format!("  {}", paint_ipa(transcript.glyphs.iter(), color)));
    }

    let mut summary = format!(
        "  {} glyphs: {} confident, {} uncertain, {} placeholder",
        transcript.glyphs.len(),
        transcript.count_mode(RenderMode::Confident),
        transcript.count_mode(RenderMode::Uncertain),
        transcript.count_mode(RenderMode::Placeholder),
    );
    if let Some((start, end)) = transcript.time_span_ms() {
        summary.push_str(&format!(" ({start}-{end} ms)"));
    }
    lines.push(if color {
        summary.dimmed().to_string()
    } else {
        summary
    });

    let counts = log_counts(&transcript.log);
    if !counts.is_empty() {
        let listed: Vec<String> = counts
            .iter()
            .map(|(kind, count)| format!("{kind} x{count}"))
            .collect();
        lines.push(format!("  log: {}", listed.join(", ")));
    }

    if verbose >= 1 {
        for entry in &transcript.log {
            lines.push(format!("    {}", format_log_entry(entry)));
        }
    }
    lines.push(String::new());
    lines.join("\n")
}

/// One-line human description of a log entry.
pub fn format_log_entry(entry: &LogEntry) -> String {
    match entry {
        LogEntry::UnknownSymbol {
            segment_id,
            position,
            symbol,
        } => format!("[{segment_id}:{position}] unknown symbol '{symbol}'"),
        LogEntry::ClusterMapped {
            segment_id,
            position,
            cluster_id,
            partition,
            glyph,
            penalty,
        } => format!(
            "[{segment_id}:{position}] cluster {cluster_id} -> {glyph} via {partition} (penalty {penalty:.2})"
        ),
        LogEntry::RuleApplied {
            segment_id,
            position,
            original,
            rule_id,
            replacement,
        } => format!("[{segment_id}:{position}] {rule_id}: {original} -> {replacement}"),
        LogEntry::AlignmentMismatch {
            segment_id,
            start,
            end,
            reason,
        } => format!("[{segment_id}:{start}-{end}] alignment mismatch: {reason}"),
        LogEntry::EventConflict {
            segment_id,
            event,
            dropped,
            kept,
        } => format!(
            "[{segment_id}] {event} over {}-{} dropped, kept {}-{}",
            dropped.start, dropped.end, kept.start, kept.end
        ),
        LogEntry::UncertainRender {
            segment_id,
            position,
            confidence,
            alternatives,
        } => format!(
            "[{segment_id}:{position}] uncertain ({confidence:.2}), {alternatives} alternative(s)"
        ),
        LogEntry::PlaceholderRender {
            segment_id,
            position,
            confidence,
        } => format!("[{segment_id}:{position}] placeholder ({confidence:.2})"),
        LogEntry::RepeatsCollapsed {
            segment_id,
            span,
            symbol,
            count,
        } => format!(
            "[{segment_id}:{}-{}] {count}x {symbol} collapsed",
            span.start, span.end
        ),
        LogEntry::BoundaryMerged {
            left_segment,
            right_segment,
            symbol,
        } => format!("[{left_segment}|{right_segment}] {symbol} merged across boundary"),
    }
}

/// snake_case name of a serializable enum value.
fn name<T: Serialize + std::fmt::Debug>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => s,
        _ => format!("{value:?}").to_lowercase(),
    }
}

/// Short articulatory description, e.g. `consonant velar nasal +voiced`.
pub fn describe_features(features: &Features) -> String {
    let mut parts = vec![name(&features.kind)];
    if let Some(place) = &features.place {
        parts.push(name(place));
    }
    if let Some(manner) = &features.manner {
        parts.push(name(manner));
    }
    if let Some(height) = &features.height {
        parts.push(name(height));
    }
    if let Some(backness) = &features.backness {
        parts.push(name(backness));
    }
    if features.place.is_some() || features.manner.is_some() {
        parts.push(if features.voiced { "+voiced" } else { "-voiced" }.to_string());
    }
    if features.rounded {
        parts.push("rounded".to_string());
    }
    if features.nasalized {
        parts.push("nasalized".to_string());
    }
    if let Some(secondary) = &features.secondary {
        parts.push(name(secondary));
    }
    parts.join(" ")
}

/// Lookup result: canonical form, aliases and features.
pub fn format_lookup(
    query: &str,
    resolved: &Resolved,
    entry: &SymbolEntry,
    features: &Features,
) -> String {
    let mut lines = vec![
        format!("{query} -> {}", resolved.text()),
        format!("  glyph:    {}", entry.glyph),
    ];
    if !resolved.diacritics.is_empty() {
        lines.push(format!("  marks:    {}", resolved.diacritics.join(" ")));
    }
    if resolved.long {
        lines.push("  long:     yes".to_string());
    }
    for (notation, alias) in &entry.aliases {
        lines.push(format!("  {:<9} {alias}", format!("{notation}:")));
    }
    lines.push(format!("  features: {}", describe_features(features)));
    lines.push(String::new());
    lines.join("\n")
}

/// Numbered rule listing for `ipaflow rules`.
pub fn format_rules(rule_set: &str, rules: &[AllophoneRule]) -> String {
    let mut lines = vec![format!("rule set: {rule_set} ({} rules)", rules.len())];
    for (i, rule) in rules.iter().enumerate() {
        lines.push(format!(
            "  {:>2}. [{:>3}] {:<22} {}",
            i + 1,
            rule.priority,
            rule.id,
            rule.describe()
        ));
    }
    lines.push(String::new());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SymbolRegistry;
    use crate::types::TokenSpan;

    fn glyph(text: &str, mode: RenderMode, segment_id: u64, start_ms: u64) -> RenderedGlyph {
        RenderedGlyph {
            text: text.to_string(),
            symbol: text.to_string(),
            mode,
            start_ms,
            end_ms: start_ms + 100,
            confidence: 0.9,
            alternatives: Vec::new(),
            rules: Vec::new(),
            segment_id,
            source: TokenSpan::single(0),
        }
    }

    fn transcript() -> AnnotatedTranscript {
        AnnotatedTranscript {
            utterance_id: "u1".to_string(),
            language: "en".to_string(),
            glyphs: vec![
                glyph("ŋ", RenderMode::Confident, 0, 0),
                glyph("(k|ɡ)", RenderMode::Uncertain, 0, 100),
                glyph("◯", RenderMode::Placeholder, 1, 200),
            ],
            events: Vec::new(),
            log: vec![
                LogEntry::RuleApplied {
                    segment_id: 0,
                    position: 0,
                    original: "n".to_string(),
                    rule_id: "en-nasal-velar".to_string(),
                    replacement: "ŋ".to_string(),
                },
                LogEntry::UncertainRender {
                    segment_id: 0,
                    position: 1,
                    confidence: 0.6,
                    alternatives: 1,
                },
                LogEntry::PlaceholderRender {
                    segment_id: 1,
                    position: 2,
                    confidence: 0.2,
                },
            ],
        }
    }

    #[test]
    fn test_format_transcript_plain() {
        let text = format_transcript(&transcript(), false, 0, false);
        assert!(text.starts_with("u1 [en]\n"));
        assert!(text.contains("  ŋ(k|ɡ)◯\n"));
        assert!(text.contains("3 glyphs: 1 confident, 1 uncertain, 1 placeholder (0-300 ms)"));
        assert!(text.contains("rule_applied x1"));
        assert!(!text.contains("en-nasal-velar: n -> ŋ"));
        assert!(!text.contains('\x1b'));
    }

    #[test]
    fn test_format_transcript_by_segment_verbose() {
        let text = format_transcript(&transcript(), true, 1, false);
        assert!(text.contains("#0    ŋ(k|ɡ)"));
        assert!(text.contains("#1    ◯"));
        assert!(text.contains("[0:0] en-nasal-velar: n -> ŋ"));
    }

    #[test]
    fn test_format_transcript_colored() {
        let text = format_transcript(&transcript(), false, 0, true);
        assert!(text.contains('\x1b'));
    }

    #[test]
    fn test_log_counts_first_seen_order() {
        let mut log = transcript().log;
        log.push(LogEntry::UncertainRender {
            segment_id: 1,
            position: 3,
            confidence: 0.7,
            alternatives: 0,
        });
        assert_eq!(
            log_counts(&log),
            vec![
                ("rule_applied", 1),
                ("uncertain_render", 2),
                ("placeholder_render", 1)
            ]
        );
    }

    #[test]
    fn test_format_conflict_entry() {
        let entry = LogEntry::EventConflict {
            segment_id: 3,
            event: "tone".to_string(),
            dropped: TokenSpan::new(1, 2),
            kept: TokenSpan::new(0, 1),
        };
        assert_eq!(format_log_entry(&entry), "[3] tone over 1-2 dropped, kept 0-1");
    }

    #[test]
    fn test_format_lookup_lists_aliases_and_features() {
        let registry = SymbolRegistry::builtin().unwrap();
        let resolved = registry.resolve("N", None).unwrap();
        let entry = registry.entry(&resolved.glyph).unwrap();
        let features = registry.features_of(&resolved.glyph, &resolved.diacritics);

        let text = format_lookup("N", &resolved, entry, &features);
        assert!(text.starts_with("N -> ŋ\n"));
        assert!(text.contains("x-sampa:  N"));
        assert!(text.contains("arpabet:  NG"));
        assert!(text.contains("features: consonant velar nasal +voiced"));
    }

    #[test]
    fn test_format_rules_numbered() {
        let registry = std::sync::Arc::new(SymbolRegistry::builtin().unwrap());
        let engine = crate::rules::RuleEngine::builtin(registry);
        let (name, rules) = engine.select("en", None);
        let text = format_rules(name, rules);
        assert!(text.starts_with("rule set: en ("));
        assert!(text.contains(" 1. [ 10] en-nasal-velar"));
    }
}
