//! Suprasegmental annotation: tone, stress, length, nasalization and
//! secondary articulation layered over the rewritten phone stream.
//!
//! Events only ever reference contiguous token spans; the phone stream itself
//! is never modified here. Contour or syllable data that does not cover the
//! span it should annotate yields an `alignment_mismatch` log entry and no
//! event.

pub mod stress;
pub mod tone;

use crate::config::{LanguageProfile, LengthConfig, ToneConfig};
use crate::error::IpaError;
use crate::registry::SymbolRegistry;
use crate::types::{
    LogEntry, Phone, ProsodySample, StressLevel, Suprasegmental, SuprasegmentalEvent, Syllable,
    Tone, TokenSpan,
};
use std::sync::Arc;
use tone::PitchRange;

/// Auxiliary contour data of one segment and where its phones sit.
#[derive(Debug, Clone, Copy)]
pub struct SegmentProsody<'a> {
    pub segment_id: u64,
    /// Utterance index of the segment's first phone.
    pub offset: usize,
    pub len: usize,
    pub samples: &'a [ProsodySample],
    pub syllables: &'a [Syllable],
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Annotation {
    pub events: Vec<SuprasegmentalEvent>,
    pub log: Vec<LogEntry>,
}

#[derive(Debug, Clone)]
pub struct Annotator {
    registry: Arc<SymbolRegistry>,
}

struct Candidates {
    events: Vec<(u64, SuprasegmentalEvent)>,
    log: Vec<LogEntry>,
}

impl Candidates {
    fn push(
        &mut self,
        segment_id: u64,
        event: Suprasegmental,
        span: TokenSpan,
        phones: &[Phone],
    ) {
        let confidence = span_confidence(phones, span);
        self.events.push((
            segment_id,
            SuprasegmentalEvent {
                event,
                span,
                confidence,
            },
        ));
    }

    fn mismatch(&mut self, segment_id: u64, span: TokenSpan, reason: impl Into<String>) {
        let reason = reason.into();
        let error = IpaError::AlignmentMismatch {
            start: span.start,
            end: span.end,
            message: reason.clone(),
        };
        tracing::debug!("Segment {segment_id}: {error}");
        self.log.push(LogEntry::AlignmentMismatch {
            segment_id,
            start: span.start,
            end: span.end,
            reason,
        });
    }
}

impl Annotator {
    pub fn new(registry: Arc<SymbolRegistry>) -> Self {
        Self { registry }
    }

    /// Attach suprasegmental events to an utterance's phones.
    pub fn annotate(
        &self,
        phones: &[Phone],
        segments: &[SegmentProsody<'_>],
        profile: &LanguageProfile,
    ) -> Annotation {
        let mut candidates = Candidates {
            events: Vec::new(),
            log: Vec::new(),
        };
        let pitch_range = pitch_range(segments, &profile.tone);

        for segment in segments {
            let Some(local) = phones.get(segment.offset..segment.offset + segment.len) else {
                candidates.mismatch(
                    segment.segment_id,
                    TokenSpan::new(segment.offset, segment.offset + segment.len),
                    "segment lies outside the phone stream",
                );
                continue;
            };
            let syllables = syllable_spans(segment, &mut candidates);

            if profile.tone.enabled {
                self.tone_events(
                    segment,
                    local,
                    &syllables,
                    pitch_range,
                    &profile.tone,
                    phones,
                    &mut candidates,
                );
            }
            if profile.stress.enabled {
                stress_events(
                    segment,
                    local,
                    &syllables,
                    profile.stress.secondary_ratio,
                    phones,
                    &mut candidates,
                );
            }
            self.segmental_events(segment, local, &profile.length, phones, &mut candidates);
        }

        let Candidates { events, mut log } = candidates;
        let (events, conflicts) = resolve_conflicts(events);
        log.extend(conflicts);
        Annotation { events, log }
    }

    #[allow(clippy::too_many_arguments)]
    fn tone_events(
        &self,
        segment: &SegmentProsody<'_>,
        local: &[Phone],
        syllables: &[(TokenSpan, Option<StressLevel>)],
        range: Option<PitchRange>,
        config: &ToneConfig,
        phones: &[Phone],
        out: &mut Candidates,
    ) {
        // Without supplied syllables every vowel carries its own tone.
        let units: Vec<TokenSpan> = if segment.syllables.is_empty() {
            local
                .iter()
                .enumerate()
                .filter(|(_, p)| {
                    !p.placeholder && self.registry.features_of(&p.glyph, &p.diacritics).is_vowel()
                })
                .map(|(i, _)| TokenSpan::single(i))
                .collect()
        } else {
            syllables.iter().map(|(span, _)| *span).collect()
        };

        for unit in units {
            let global = shift(unit, segment.offset);
            let Some((start_ms, end_ms)) = window(local, unit) else {
                out.mismatch(segment.segment_id, global, "tone unit has no duration");
                continue;
            };
            let pitches: Vec<f32> = samples_in(segment.samples, start_ms, end_ms)
                .filter_map(|s| s.pitch_hz)
                .filter(|hz| *hz > 0.0)
                .collect();
            let Some(range) = range.filter(|_| !pitches.is_empty()) else {
                out.mismatch(segment.segment_id, global, "no voiced pitch samples");
                continue;
            };
            let levels = tone::contour(&pitches, range, config.levels);
            let text = tone::render(&levels, config.levels, config.notation);
            out.push(
                segment.segment_id,
                Suprasegmental::Tone(Tone {
                    levels,
                    scale: config.levels,
                    text,
                }),
                global,
                phones,
            );
        }
    }

    fn segmental_events(
        &self,
        segment: &SegmentProsody<'_>,
        local: &[Phone],
        length: &LengthConfig,
        phones: &[Phone],
        out: &mut Candidates,
    ) {
        let threshold = length.threshold_ms();
        for (i, phone) in local.iter().enumerate() {
            if phone.placeholder {
                continue;
            }
            let span = TokenSpan::single(segment.offset + i);
            if phone.end_ms < phone.start_ms {
                out.mismatch(segment.segment_id, span, "token ends before it starts");
                continue;
            }
            if phone.long || phone.duration_ms() as f32 > threshold {
                out.push(segment.segment_id, Suprasegmental::Length, span, phones);
            }
            let features = self.registry.features_of(&phone.glyph, &phone.diacritics);
            if features.nasalized {
                out.push(segment.segment_id, Suprasegmental::Nasalization, span, phones);
            }
            if let Some(secondary) = features.secondary {
                out.push(
                    segment.segment_id,
                    Suprasegmental::SecondaryArticulation(secondary),
                    span,
                    phones,
                );
            }
        }
    }
}

fn stress_events(
    segment: &SegmentProsody<'_>,
    local: &[Phone],
    syllables: &[(TokenSpan, Option<StressLevel>)],
    secondary_ratio: f32,
    phones: &[Phone],
    out: &mut Candidates,
) {
    if syllables.is_empty() {
        return;
    }
    let asserted: Vec<Option<StressLevel>> = syllables.iter().map(|(_, s)| *s).collect();
    let prominence: Vec<Option<f32>> = syllables
        .iter()
        .map(|(span, stress)| {
            let (start_ms, end_ms) = window(local, *span)?;
            let energies: Vec<f32> = samples_in(segment.samples, start_ms, end_ms)
                .filter_map(|s| s.energy)
                .collect();
            if energies.is_empty() {
                if stress.is_none() {
                    out.mismatch(
                        segment.segment_id,
                        shift(*span, segment.offset),
                        "no energy samples",
                    );
                }
                return None;
            }
            let mean = energies.iter().sum::<f32>() / energies.len() as f32;
            Some(mean * (end_ms - start_ms) as f32)
        })
        .collect();

    let levels = stress::assign(&prominence, &asserted, secondary_ratio);
    for ((span, _), level) in syllables.iter().zip(levels) {
        if let Some(level @ (StressLevel::Primary | StressLevel::Secondary)) = level {
            out.push(
                segment.segment_id,
                Suprasegmental::Stress(level),
                shift(*span, segment.offset),
                phones,
            );
        }
    }
}

/// Valid syllables as segment-local spans; invalid ones are logged.
fn syllable_spans(
    segment: &SegmentProsody<'_>,
    out: &mut Candidates,
) -> Vec<(TokenSpan, Option<StressLevel>)> {
    let mut spans = Vec::new();
    for syllable in segment.syllables {
        if syllable.start > syllable.end || syllable.end >= segment.len {
            out.mismatch(
                segment.segment_id,
                shift(TokenSpan::new(syllable.start, syllable.end), segment.offset),
                format!("syllable outside segment of {} tokens", segment.len),
            );
            continue;
        }
        spans.push((TokenSpan::new(syllable.start, syllable.end), syllable.stress));
    }
    spans
}

/// Fixed range from configuration, completed from the utterance's voiced samples.
fn pitch_range(segments: &[SegmentProsody<'_>], config: &ToneConfig) -> Option<PitchRange> {
    let observed = PitchRange::from_samples(
        segments
            .iter()
            .flat_map(|s| s.samples.iter())
            .filter_map(|s| s.pitch_hz)
            .filter(|hz| *hz > 0.0),
    );
    let floor_hz = config.pitch_floor_hz.or(observed.map(|r| r.floor_hz))?;
    let ceiling_hz = config.pitch_ceiling_hz.or(observed.map(|r| r.ceiling_hz))?;
    Some(PitchRange {
        floor_hz,
        ceiling_hz,
    })
}

/// Time covered by a local span, `None` when it is empty.
fn window(local: &[Phone], span: TokenSpan) -> Option<(u64, u64)> {
    let start_ms = local.get(span.start)?.start_ms;
    let end_ms = local.get(span.end)?.end_ms;
    (end_ms > start_ms).then_some((start_ms, end_ms))
}

fn samples_in(
    samples: &[ProsodySample],
    start_ms: u64,
    end_ms: u64,
) -> impl Iterator<Item = &ProsodySample> {
    samples
        .iter()
        .filter(move |s| s.time_ms >= start_ms && s.time_ms < end_ms)
}

/// Segment-local span to utterance positions; out-of-range indices saturate.
fn shift(span: TokenSpan, offset: usize) -> TokenSpan {
    TokenSpan::new(
        span.start.saturating_add(offset),
        span.end.saturating_add(offset),
    )
}

fn span_confidence(phones: &[Phone], span: TokenSpan) -> f32 {
    let covered = phones.get(span.start..=span.end).unwrap_or_default();
    if covered.is_empty() {
        return 0.0;
    }
    covered.iter().map(|p| p.confidence).sum::<f32>() / covered.len() as f32
}

/// Drop overlapping events of the same kind.
///
/// The winner is the event with the highest confidence, then the earliest
/// span start, then the earliest emitted. Survivors are ordered by span start.
pub fn resolve_conflicts(
    candidates: Vec<(u64, SuprasegmentalEvent)>,
) -> (Vec<SuprasegmentalEvent>, Vec<LogEntry>) {
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|&a, &b| {
        let (ea, eb) = (&candidates[a].1, &candidates[b].1);
        ea.event
            .kind_rank()
            .cmp(&eb.event.kind_rank())
            .then(eb.confidence.total_cmp(&ea.confidence))
            .then(ea.span.start.cmp(&eb.span.start))
            .then(a.cmp(&b))
    });

    let mut kept: Vec<usize> = Vec::new();
    let mut log = Vec::new();
    for index in order {
        let (segment_id, event) = &candidates[index];
        let winner = kept.iter().find(|&&k| {
            let other = &candidates[k].1;
            other.event.kind_rank() == event.event.kind_rank() && other.span.overlaps(&event.span)
        });
        match winner {
            Some(&k) => log.push(LogEntry::EventConflict {
                segment_id: *segment_id,
                event: event.event.kind_name().to_string(),
                dropped: event.span,
                kept: candidates[k].1.span,
            }),
            None => kept.push(index),
        }
    }

    kept.sort_by(|&a, &b| {
        let (ea, eb) = (&candidates[a].1, &candidates[b].1);
        ea.span
            .start
            .cmp(&eb.span.start)
            .then(ea.event.kind_rank().cmp(&eb.event.kind_rank()))
            .then(ea.span.end.cmp(&eb.span.end))
    });
    let mut slots: Vec<Option<SuprasegmentalEvent>> =
        candidates.into_iter().map(|(_, e)| Some(e)).collect();
    let events = kept.into_iter().filter_map(|i| slots[i].take()).collect();
    (events, log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::registry::features::SecondaryArticulation;
    use crate::types::ToneNotation;

    fn phone(glyph: &str, index: usize, start_ms: u64, end_ms: u64) -> Phone {
        Phone {
            glyph: glyph.to_string(),
            diacritics: Vec::new(),
            long: false,
            placeholder: false,
            index,
            segment_id: 0,
            utterance_id: Arc::from("u1"),
            start_ms,
            end_ms,
            confidence: 0.9,
            candidates: Vec::new(),
            rules: Vec::new(),
        }
    }

    fn annotator() -> Annotator {
        Annotator::new(Arc::new(SymbolRegistry::builtin().unwrap()))
    }

    fn profile() -> LanguageProfile {
        Config::default().profile("xx").unwrap()
    }

    fn sample(time_ms: u64, pitch_hz: Option<f32>, energy: Option<f32>) -> ProsodySample {
        ProsodySample {
            time_ms,
            pitch_hz,
            energy,
        }
    }

    fn segment<'a>(
        len: usize,
        samples: &'a [ProsodySample],
        syllables: &'a [Syllable],
    ) -> SegmentProsody<'a> {
        SegmentProsody {
            segment_id: 0,
            offset: 0,
            len,
            samples,
            syllables,
        }
    }

    fn falling_samples() -> Vec<ProsodySample> {
        [150.0, 150.0, 140.0, 125.0, 105.0, 105.0]
            .iter()
            .enumerate()
            .map(|(i, &hz)| sample(i as u64 * 30, Some(hz), Some(1.0)))
            .collect()
    }

    fn tone_profile(notation: ToneNotation) -> LanguageProfile {
        let mut profile = profile();
        profile.tone.enabled = true;
        profile.tone.notation = notation;
        profile.tone.pitch_floor_hz = Some(100.0);
        profile.tone.pitch_ceiling_hz = Some(200.0);
        profile
    }

    #[test]
    fn test_falling_tone_contour_letters() {
        let phones = vec![phone("m", 0, 0, 60), phone("a", 1, 60, 180)];
        let samples = falling_samples();
        let syllables = [Syllable {
            start: 0,
            end: 1,
            stress: None,
        }];
        let annotation = annotator().annotate(
            &phones,
            &[segment(2, &samples, &syllables)],
            &tone_profile(ToneNotation::Contour),
        );

        let tone = annotation
            .events
            .iter()
            .find_map(|e| match &e.event {
                Suprasegmental::Tone(tone) => Some((tone.clone(), e.span)),
                _ => None,
            })
            .unwrap();
        assert_eq!(tone.0.levels, vec![3, 1]);
        assert_eq!(tone.0.text, "˧˩");
        assert_eq!(tone.1, TokenSpan::new(0, 1));
    }

    #[test]
    fn test_falling_tone_level_digits() {
        let phones = vec![phone("a", 0, 0, 180)];
        let samples = falling_samples();
        let annotation = annotator().annotate(
            &phones,
            &[segment(1, &samples, &[])],
            &tone_profile(ToneNotation::Level),
        );
        assert!(annotation.events.iter().any(|e| matches!(
            &e.event,
            Suprasegmental::Tone(tone) if tone.text == "³¹"
        )));
    }

    #[test]
    fn test_tone_without_pitch_is_alignment_mismatch() {
        let phones = vec![phone("a", 0, 0, 100)];
        let samples = vec![sample(10, None, Some(1.0))];
        let annotation = annotator().annotate(
            &phones,
            &[segment(1, &samples, &[])],
            &tone_profile(ToneNotation::Level),
        );
        assert!(annotation.events.is_empty());
        assert_eq!(annotation.log.len(), 1);
        assert_eq!(annotation.log[0].kind_name(), "alignment_mismatch");
    }

    #[test]
    fn test_tone_disabled_by_default() {
        let phones = vec![phone("a", 0, 0, 120)];
        let samples = falling_samples();
        let annotation =
            annotator().annotate(&phones, &[segment(1, &samples, &[])], &profile());
        assert!(annotation.events.is_empty());
        assert!(annotation.log.is_empty());
    }

    #[test]
    fn test_stress_on_syllables() {
        let phones = vec![
            phone("b", 0, 0, 50),
            phone("a", 1, 50, 150),
            phone("n", 2, 150, 200),
            phone("a", 3, 200, 260),
        ];
        let samples = vec![
            sample(20, None, Some(2.0)),
            sample(100, None, Some(4.0)),
            sample(180, None, Some(1.0)),
            sample(230, None, Some(1.0)),
        ];
        let syllables = [
            Syllable {
                start: 0,
                end: 1,
                stress: None,
            },
            Syllable {
                start: 2,
                end: 3,
                stress: None,
            },
        ];
        let annotation =
            annotator().annotate(&phones, &[segment(4, &samples, &syllables)], &profile());

        assert_eq!(
            annotation.events,
            vec![SuprasegmentalEvent {
                event: Suprasegmental::Stress(StressLevel::Primary),
                span: TokenSpan::new(0, 1),
                confidence: 0.9,
            }]
        );
    }

    #[test]
    fn test_syllable_out_of_range_is_skipped() {
        let phones = vec![phone("a", 0, 0, 100)];
        let syllables = [Syllable {
            start: 0,
            end: 4,
            stress: Some(StressLevel::Primary),
        }];
        let annotation =
            annotator().annotate(&phones, &[segment(1, &[], &syllables)], &profile());
        assert!(annotation.events.is_empty());
        assert!(matches!(
            annotation.log[0],
            LogEntry::AlignmentMismatch { start: 0, end: 4, .. }
        ));
    }

    #[test]
    fn test_huge_syllable_in_later_segment_is_logged() {
        let phones = vec![phone("a", 0, 0, 100), phone("o", 1, 100, 200)];
        let syllables = [Syllable {
            start: 0,
            end: usize::MAX,
            stress: Some(StressLevel::Primary),
        }];
        let second = SegmentProsody {
            segment_id: 1,
            offset: 1,
            len: 1,
            samples: &[],
            syllables: &syllables,
        };
        let annotation = annotator().annotate(
            &phones,
            &[segment(1, &[], &[]), second],
            &profile(),
        );

        assert!(annotation.events.is_empty());
        assert!(matches!(
            annotation.log[0],
            LogEntry::AlignmentMismatch {
                segment_id: 1,
                start: 1,
                end: usize::MAX,
                ..
            }
        ));
    }

    #[test]
    fn test_long_duration_gets_length_event() {
        let phones = vec![phone("s", 0, 0, 80), phone("s", 1, 80, 400)];
        let annotation = annotator().annotate(&phones, &[segment(2, &[], &[])], &profile());
        assert_eq!(annotation.events.len(), 1);
        assert_eq!(annotation.events[0].event, Suprasegmental::Length);
        assert_eq!(annotation.events[0].span, TokenSpan::single(1));
    }

    #[test]
    fn test_explicit_long_mark_gets_length_event() {
        let mut long = phone("a", 0, 0, 60);
        long.long = true;
        let annotation = annotator().annotate(&[long], &[segment(1, &[], &[])], &profile());
        assert_eq!(annotation.events[0].event, Suprasegmental::Length);
    }

    #[test]
    fn test_nasal_and_secondary_from_features() {
        let mut labialized = phone("k", 1, 100, 160);
        labialized.diacritics = vec!["ʷ".to_string()];
        let phones = vec![phone("a\u{303}", 0, 0, 100), labialized];
        let annotation = annotator().annotate(&phones, &[segment(2, &[], &[])], &profile());

        let kinds: Vec<&Suprasegmental> = annotation.events.iter().map(|e| &e.event).collect();
        assert_eq!(
            kinds,
            vec![
                &Suprasegmental::Nasalization,
                &Suprasegmental::SecondaryArticulation(SecondaryArticulation::Labialized),
            ]
        );
    }

    #[test]
    fn test_placeholders_get_no_events() {
        let mut unknown = phone("◯", 0, 0, 500);
        unknown.placeholder = true;
        let annotation = annotator().annotate(&[unknown], &[segment(1, &[], &[])], &profile());
        assert!(annotation.events.is_empty());
    }

    #[test]
    fn test_conflict_keeps_highest_confidence() {
        let tone = |text: &str| {
            Suprasegmental::Tone(Tone {
                levels: vec![3],
                scale: 5,
                text: text.to_string(),
            })
        };
        let candidates = vec![
            (
                0,
                SuprasegmentalEvent {
                    event: tone("a"),
                    span: TokenSpan::new(0, 1),
                    confidence: 0.6,
                },
            ),
            (
                0,
                SuprasegmentalEvent {
                    event: tone("b"),
                    span: TokenSpan::new(1, 2),
                    confidence: 0.8,
                },
            ),
            (
                0,
                SuprasegmentalEvent {
                    event: Suprasegmental::Length,
                    span: TokenSpan::single(1),
                    confidence: 0.5,
                },
            ),
        ];

        let (events, log) = resolve_conflicts(candidates);

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event, tone("b"));
        assert_eq!(events[1].span, TokenSpan::single(1));
        assert_eq!(
            log,
            vec![LogEntry::EventConflict {
                segment_id: 0,
                event: "tone".to_string(),
                dropped: TokenSpan::new(0, 1),
                kept: TokenSpan::new(1, 2),
            }]
        );
    }

    #[test]
    fn test_conflict_tie_goes_to_earliest_span() {
        let event = |start, end| {
            (
                0,
                SuprasegmentalEvent {
                    event: Suprasegmental::Stress(StressLevel::Primary),
                    span: TokenSpan::new(start, end),
                    confidence: 0.7,
                },
            )
        };
        let (events, log) = resolve_conflicts(vec![event(1, 2), event(0, 1)]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].span, TokenSpan::new(0, 1));
        assert_eq!(log.len(), 1);
    }
}
