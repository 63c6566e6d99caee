//! Transcript assembly: repeat collapsing, boundary smoothing and final
//! glyph composition.
//!
//! Assembly never re-evaluates rules or confidence. It only merges rendered
//! phones and writes suprasegmental marks around them: stress before the first
//! glyph of its span, length after the glyph, tone after the last glyph of its
//! span.

use crate::config::AssemblyConfig;
use crate::defaults::{LENGTH_MARK, PRIMARY_STRESS_MARK, SECONDARY_STRESS_MARK};
use crate::render::RenderedPhone;
use crate::types::{
    LogEntry, RenderMode, RenderedGlyph, StressLevel, Suprasegmental, SuprasegmentalEvent,
    TokenSpan,
};

/// One output glyph under construction.
#[derive(Debug, Clone)]
struct Draft {
    glyph: RenderedGlyph,
    core: String,
    members: usize,
    confidence_sum: f32,
}

impl Draft {
    fn new(rendered: RenderedPhone) -> Self {
        let phone = rendered.phone;
        Self {
            glyph: RenderedGlyph {
                text: String::new(),
                symbol: rendered.symbol,
                mode: rendered.mode,
                start_ms: phone.start_ms,
                end_ms: phone.end_ms,
                confidence: phone.confidence,
                alternatives: rendered.alternatives,
                rules: phone.rules,
                segment_id: phone.segment_id,
                source: TokenSpan::single(phone.index),
            },
            core: rendered.core,
            members: 1,
            confidence_sum: phone.confidence,
        }
    }

    fn same_as(&self, other: &Draft) -> bool {
        self.glyph.mode != RenderMode::Placeholder
            && self.glyph.mode == other.glyph.mode
            && self.glyph.symbol == other.glyph.symbol
    }

    /// Absorb the following draft.
    fn absorb(&mut self, next: Draft) {
        self.glyph.end_ms = self.glyph.end_ms.max(next.glyph.end_ms);
        self.glyph.source.end = next.glyph.source.end;
        for rule in next.glyph.rules {
            if !self.glyph.rules.contains(&rule) {
                self.glyph.rules.push(rule);
            }
        }
        self.members += next.members;
        self.confidence_sum += next.confidence_sum;
    }

    fn finish(mut self, events: &[SuprasegmentalEvent]) -> RenderedGlyph {
        let span = self.glyph.source;
        let mut text = String::new();

        let stress = events.iter().find_map(|e| match e.event {
            Suprasegmental::Stress(level) if span.contains(e.span.start) => Some(level),
            _ => None,
        });
        match stress {
            Some(StressLevel::Primary) => text.push_str(PRIMARY_STRESS_MARK),
            Some(StressLevel::Secondary) => text.push_str(SECONDARY_STRESS_MARK),
            _ => {}
        }

        text.push_str(&self.core);

        let long = self.members > 1
            || events
                .iter()
                .any(|e| e.event == Suprasegmental::Length && span.contains(e.span.start));
        if long {
            text.push_str(LENGTH_MARK);
        }

        if let Some(tone) = events.iter().find_map(|e| match &e.event {
            Suprasegmental::Tone(tone) if span.contains(e.span.end) => Some(tone.text.as_str()),
            _ => None,
        }) {
            text.push_str(tone);
        }

        self.glyph.confidence = self.confidence_sum / self.members as f32;
        self.glyph.text = text;
        self.glyph
    }
}

/// Merge rendered phones into the final glyph sequence.
///
/// Returns the glyphs and the assembly log entries.
pub fn assemble(
    rendered: Vec<RenderedPhone>,
    events: &[SuprasegmentalEvent],
    config: &AssemblyConfig,
) -> (Vec<RenderedGlyph>, Vec<LogEntry>) {
    let mut log = Vec::new();
    let mut drafts: Vec<Draft> = rendered.into_iter().map(Draft::new).collect();

    if config.collapse_repeats {
        drafts = collapse_repeats(drafts, &mut log);
    }
    if config.smooth_boundaries {
        drafts = smooth_boundaries(drafts, config.boundary_tolerance_ms, &mut log);
    }

    let glyphs = drafts.into_iter().map(|d| d.finish(events)).collect();
    (glyphs, log)
}

/// Collapse runs of identical glyphs within a segment into one long glyph.
fn collapse_repeats(drafts: Vec<Draft>, log: &mut Vec<LogEntry>) -> Vec<Draft> {
    let mut out: Vec<Draft> = Vec::with_capacity(drafts.len());
    for draft in drafts {
        match out.last_mut() {
            Some(last)
                if last.glyph.segment_id == draft.glyph.segment_id && last.same_as(&draft) =>
            {
                last.absorb(draft);
            }
            _ => out.push(draft),
        }
    }

    for draft in out.iter().filter(|d| d.members > 1) {
        log.push(LogEntry::RepeatsCollapsed {
            segment_id: draft.glyph.segment_id,
            span: draft.glyph.source,
            symbol: draft.glyph.symbol.clone(),
            count: draft.members,
        });
    }
    out
}

/// Merge a glyph duplicated across adjacent segments.
///
/// The segments must abut or overlap within `tolerance_ms`; the right-hand
/// duplicate is folded into the left one.
fn smooth_boundaries(
    drafts: Vec<Draft>,
    tolerance_ms: u64,
    log: &mut Vec<LogEntry>,
) -> Vec<Draft> {
    let mut out: Vec<Draft> = Vec::with_capacity(drafts.len());
    for draft in drafts {
        if let Some(last) = out.last_mut()
            && last.glyph.segment_id != draft.glyph.segment_id
            && last.same_as(&draft)
            && draft.glyph.start_ms <= last.glyph.end_ms.saturating_add(tolerance_ms)
        {
            log.push(LogEntry::BoundaryMerged {
                left_segment: last.glyph.segment_id,
                right_segment: draft.glyph.segment_id,
                symbol: draft.glyph.symbol.clone(),
            });
            let members = last.members;
            let confidence = (last.confidence_sum / members as f32)
                .max(draft.confidence_sum / draft.members as f32);
            last.absorb(draft);
            last.members = members;
            last.confidence_sum = confidence * members as f32;
            continue;
        }
        out.push(draft);
    }
    out
}
