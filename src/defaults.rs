//! Default configuration constants for ipaflow.
//!
//! Shared by the configuration types and the components that fall back to
//! them when a language profile leaves a value unset.

/// Language code used when the upstream recognizer gives no hint.
pub const UNKNOWN_LANGUAGE: &str = "unknown";

/// Partition key of the language-agnostic mapping table.
pub const GLOBAL_PARTITION: &str = "*";

/// Minimum effective confidence for a glyph to render without brackets.
pub const CONFIDENT_MIN: f32 = 0.85;

/// Minimum effective confidence for a bracketed best guess.
///
/// Anything below renders as the placeholder glyph.
pub const UNCERTAIN_MIN: f32 = 0.5;

/// Maximum number of alternative candidates shown inside uncertainty brackets.
pub const MAX_ALTERNATIVES: usize = 3;

/// Glyph rendered for phones with no confident or known IPA target.
pub const PLACEHOLDER_GLYPH: &str = "◯";

/// Opening uncertainty bracket.
pub const UNCERTAIN_OPEN: &str = "(";

/// Closing uncertainty bracket.
pub const UNCERTAIN_CLOSE: &str = ")";

/// Separator between the best guess and its alternatives inside brackets.
pub const ALTERNATIVE_SEPARATOR: &str = "|";

/// Number of discrete tone levels (Chao convention).
pub const TONE_LEVELS: u8 = 5;

/// Mean phone duration of the default length model, in milliseconds.
pub const LENGTH_MEAN_MS: f32 = 90.0;

/// Standard deviation of the default length model, in milliseconds.
pub const LENGTH_STDDEV_MS: f32 = 35.0;

/// Standard scores above the mean at which a phone counts as long.
pub const LENGTH_Z_THRESHOLD: f32 = 2.0;

/// Syllables at or above this share of the most prominent syllable get secondary stress.
pub const SECONDARY_STRESS_RATIO: f32 = 0.8;

/// Maximum feature distance at which a cluster maps to a known symbol.
pub const FEATURE_DISTANCE_THRESHOLD: f32 = 0.25;

/// Maximum gap between adjacent segments for boundary smoothing, in milliseconds.
pub const BOUNDARY_TOLERANCE_MS: u64 = 20;

/// Primary stress mark.
pub const PRIMARY_STRESS_MARK: &str = "ˈ";

/// Secondary stress mark.
pub const SECONDARY_STRESS_MARK: &str = "ˌ";

/// Length mark.
pub const LENGTH_MARK: &str = "ː";
