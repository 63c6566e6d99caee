//! Stress assignment over externally supplied syllables.

use crate::types::StressLevel;

/// Assign stress from per-syllable prominence.
///
/// The most prominent syllable (earliest on ties) is primary; syllables at or
/// above `secondary_ratio` of it are secondary; the rest are unstressed.
/// Stress asserted upstream replaces the estimate for that syllable, and an
/// upstream primary suppresses the estimated one. `None` prominence (no
/// energy data) yields no assignment unless asserted upstream.
pub fn assign(
    prominence: &[Option<f32>],
    asserted: &[Option<StressLevel>],
    secondary_ratio: f32,
) -> Vec<Option<StressLevel>> {
    let upstream_primary = asserted.contains(&Some(StressLevel::Primary));
    let mut peak: Option<(usize, f32)> = None;
    for (index, value) in prominence.iter().enumerate() {
        if asserted.get(index).copied().flatten().is_some() {
            continue;
        }
        if let Some(value) = *value
            && value > 0.0
            && peak.is_none_or(|(_, best)| value > best)
        {
            peak = Some((index, value));
        }
    }

    prominence
        .iter()
        .enumerate()
        .map(|(index, value)| {
            if let Some(level) = asserted.get(index).copied().flatten() {
                return Some(level);
            }
            let value = (*value)?;
            let (peak_index, peak_value) = peak?;
            if index == peak_index && !upstream_primary {
                Some(StressLevel::Primary)
            } else if value >= secondary_ratio * peak_value {
                Some(StressLevel::Secondary)
            } else {
                Some(StressLevel::Unstressed)
            }
        })
        .collect()
}
