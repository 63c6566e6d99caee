//! Pitch quantization and tone rendering.

use crate::types::ToneNotation;

const SUPERSCRIPT_DIGITS: [char; 10] = ['⁰', '¹', '²', '³', '⁴', '⁵', '⁶', '⁷', '⁸', '⁹'];

/// Tone letters from lowest to highest.
const TONE_LETTERS: [char; 5] = ['˩', '˨', '˧', '˦', '˥'];

/// Pitch interval mapped onto the level grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchRange {
    pub floor_hz: f32,
    pub ceiling_hz: f32,
}

impl PitchRange {
    /// Range spanned by a set of pitch values.
    pub fn from_samples(pitches: impl IntoIterator<Item = f32>) -> Option<Self> {
        let mut range: Option<Self> = None;
        for hz in pitches {
            range = Some(match range {
                None => Self {
                    floor_hz: hz,
                    ceiling_hz: hz,
                },
                Some(r) => Self {
                    floor_hz: r.floor_hz.min(hz),
                    ceiling_hz: r.ceiling_hz.max(hz),
                },
            });
        }
        range
    }
}

/// Level of one pitch value, `1..=levels`.
///
/// The range is divided into `levels` equal bands. A degenerate range puts
/// everything on the middle level.
pub fn quantize(hz: f32, range: PitchRange, levels: u8) -> u8 {
    let levels = levels.max(1);
    let width = range.ceiling_hz - range.floor_hz;
    if width <= f32::EPSILON {
        return levels.div_ceil(2);
    }
    let frac = ((hz - range.floor_hz) / width).clamp(0.0, 1.0);
    let level = ((frac * levels as f32).floor() as u8).saturating_add(1);
    level.min(levels)
}

/// Contour of a syllable's pitch track, in time order.
///
/// The track is summarized by the mean of its first and last thirds; the
/// middle third is kept only when it is a peak or a dip. Repeated adjacent
/// levels are merged, so a level tone yields one point.
pub fn contour(pitches: &[f32], range: PitchRange, levels: u8) -> Vec<u8> {
    if pitches.is_empty() {
        return Vec::new();
    }
    let n = pitches.len();
    let k = (n / 3).max(1);
    let start = quantize(mean(&pitches[..k]), range, levels);
    let end = quantize(mean(&pitches[n - k..]), range, levels);

    let mut points = vec![start];
    if n > 2 * k {
        let mid = quantize(mean(&pitches[k..n - k]), range, levels);
        if mid > start.max(end) || mid < start.min(end) {
            points.push(mid);
        }
    }
    points.push(end);
    points.dedup();
    points
}

fn mean(values: &[f32]) -> f32 {
    values.iter().sum::<f32>() / values.len() as f32
}

/// Render contour points on a `scale`-level grid.
///
/// Level notation uses Chao digits with a level tone doubled (`³³`); contour
/// notation uses tone letters with a level tone written once.
pub fn render(levels: &[u8], scale: u8, notation: ToneNotation) -> String {
    match notation {
        ToneNotation::Level => {
            let digits: String = levels
                .iter()
                .map(|&l| SUPERSCRIPT_DIGITS[usize::from(l.min(9))])
                .collect();
            if levels.len() == 1 {
                digits.repeat(2)
            } else {
                digits
            }
        }
        ToneNotation::Contour => levels
            .iter()
            .map(|&l| TONE_LETTERS[letter_index(l, scale)])
            .collect(),
    }
}

fn letter_index(level: u8, scale: u8) -> usize {
    if scale <= 1 {
        return 2;
    }
    let position = f32::from(level.clamp(1, scale) - 1) / f32::from(scale - 1);
    (position * 4.0).round() as usize
}
