//! Articulatory features and the numeric vectors used for nearest-symbol search.

use serde::{Deserialize, Serialize};

/// Number of dimensions in a [`FeatureVector`].
pub const FEATURE_DIMS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    Consonant,
    Vowel,
    Placeholder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Place {
    Bilabial,
    Labiodental,
    Dental,
    Alveolar,
    Postalveolar,
    Retroflex,
    Palatal,
    Velar,
    LabialVelar,
    Uvular,
    Pharyngeal,
    Glottal,
}

impl Place {
    fn ordinal(self) -> f32 {
        self as u8 as f32 / Place::Glottal as u8 as f32
    }
}

/// Manner of articulation, ordered from closest to most open stricture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Manner {
    Plosive,
    Affricate,
    Fricative,
    Nasal,
    Trill,
    Tap,
    LateralApproximant,
    Approximant,
}

impl Manner {
    fn ordinal(self) -> f32 {
        self as u8 as f32 / Manner::Approximant as u8 as f32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Height {
    Close,
    NearClose,
    CloseMid,
    Mid,
    OpenMid,
    NearOpen,
    Open,
}

impl Height {
    fn ordinal(self) -> f32 {
        self as u8 as f32 / Height::Open as u8 as f32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backness {
    Front,
    Central,
    Back,
}

impl Backness {
    fn ordinal(self) -> f32 {
        self as u8 as f32 / Backness::Back as u8 as f32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecondaryArticulation {
    Labialized,
    Palatalized,
    Velarized,
    Pharyngealized,
}

/// Articulatory description of one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Features {
    pub kind: SegmentKind,
    pub place: Option<Place>,
    pub manner: Option<Manner>,
    pub voiced: bool,
    pub height: Option<Height>,
    pub backness: Option<Backness>,
    pub rounded: bool,
    pub nasalized: bool,
    pub secondary: Option<SecondaryArticulation>,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            kind: SegmentKind::Placeholder,
            place: None,
            manner: None,
            voiced: false,
            height: None,
            backness: None,
            rounded: false,
            nasalized: false,
            secondary: None,
        }
    }
}

impl Features {
    pub fn consonant(place: Place, manner: Manner, voiced: bool) -> Self {
        Self {
            kind: SegmentKind::Consonant,
            place: Some(place),
            manner: Some(manner),
            voiced,
            ..Self::default()
        }
    }

    pub fn vowel(height: Height, backness: Backness, rounded: bool) -> Self {
        Self {
            kind: SegmentKind::Vowel,
            voiced: true,
            height: Some(height),
            backness: Some(backness),
            rounded,
            ..Self::default()
        }
    }

    pub fn nasalized(mut self) -> Self {
        self.nasalized = true;
        self
    }

    pub fn with_secondary(mut self, secondary: SecondaryArticulation) -> Self {
        self.secondary = Some(secondary);
        self
    }

    pub fn is_vowel(&self) -> bool {
        self.kind == SegmentKind::Vowel
    }

    pub fn is_consonant(&self) -> bool {
        self.kind == SegmentKind::Consonant
    }

    /// Numeric projection of these features. Placeholders have none.
    ///
    /// Dimensions: consonantal, place, manner, voicing, height, backness,
    /// rounding, nasality. Every value lies in `[0, 1]`.
    pub fn vector(&self) -> Option<FeatureVector> {
        let consonantal = match self.kind {
            SegmentKind::Consonant => 1.0,
            SegmentKind::Vowel => 0.0,
            SegmentKind::Placeholder => return None,
        };
        let nasal = self.nasalized || self.manner == Some(Manner::Nasal);
        Some(FeatureVector([
            consonantal,
            self.place.map_or(0.0, Place::ordinal),
            self.manner.map_or(0.0, Manner::ordinal),
            bool_dim(self.voiced),
            self.height.map_or(0.0, Height::ordinal),
            self.backness.map_or(0.0, Backness::ordinal),
            bool_dim(self.rounded),
            bool_dim(nasal),
        ]))
    }
}

fn bool_dim(value: bool) -> f32 {
    if value { 1.0 } else { 0.0 }
}

/// Point in articulatory feature space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(pub [f32; FEATURE_DIMS]);

impl FeatureVector {
    /// Root-mean-square difference, in `[0, 1]` for vectors inside the unit cube.
    pub fn distance(&self, other: &FeatureVector) -> f32 {
        let sum: f32 = self
            .0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum();
        (sum / FEATURE_DIMS as f32).sqrt()
    }

    /// Weighted mean of vectors. Returns `None` when the total weight is zero.
    pub fn centroid<'a>(points: impl IntoIterator<Item = (&'a FeatureVector, f32)>) -> Option<Self> {
        let mut acc = [0.0f32; FEATURE_DIMS];
        let mut total = 0.0f32;
        for (point, weight) in points {
            for (slot, value) in acc.iter_mut().zip(point.0.iter()) {
                *slot += value * weight;
            }
            total += weight;
        }
        if total <= 0.0 {
            return None;
        }
        for slot in acc.iter_mut() {
            *slot /= total;
        }
        Some(FeatureVector(acc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_has_no_vector() {
        assert!(Features::default().vector().is_none());
    }

    #[test]
    fn test_identical_features_have_zero_distance() {
        let t = Features::consonant(Place::Alveolar, Manner::Plosive, false);
        let v = t.vector().unwrap();
        assert_eq!(v.distance(&v), 0.0);
    }

    #[test]
    fn test_consonants_closer_to_each_other_than_to_vowels() {
        let t = Features::consonant(Place::Alveolar, Manner::Plosive, false)
            .vector()
            .unwrap();
        let d = Features::consonant(Place::Alveolar, Manner::Plosive, true)
            .vector()
            .unwrap();
        let k = Features::consonant(Place::Velar, Manner::Plosive, false)
            .vector()
            .unwrap();
        let a = Features::vowel(Height::Open, Backness::Front, false)
            .vector()
            .unwrap();
        assert!(t.distance(&k) < t.distance(&a));
        assert!(t.distance(&d) < t.distance(&a));
    }

    #[test]
    fn test_distance_is_bounded() {
        let zeros = FeatureVector([0.0; FEATURE_DIMS]);
        let ones = FeatureVector([1.0; FEATURE_DIMS]);
        assert!((zeros.distance(&ones) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_nasal_manner_sets_nasal_dimension() {
        let n = Features::consonant(Place::Alveolar, Manner::Nasal, true)
            .vector()
            .unwrap();
        assert_eq!(n.0[7], 1.0);
    }

    #[test]
    fn test_centroid_weighted() {
        let a = FeatureVector([0.0; FEATURE_DIMS]);
        let b = FeatureVector([1.0; FEATURE_DIMS]);
        let c = FeatureVector::centroid([(&a, 3.0), (&b, 1.0)]).unwrap();
        assert!((c.0[0] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_centroid_empty_is_none() {
        assert!(FeatureVector::centroid(std::iter::empty::<(&FeatureVector, f32)>()).is_none());
    }

    #[test]
    fn test_features_toml_defaults() {
        let features: Features = toml::from_str(
            r#"
                kind = "consonant"
                place = "velar"
                manner = "nasal"
                voiced = true
            "#,
        )
        .unwrap();
        assert_eq!(features.place, Some(Place::Velar));
        assert!(!features.nasalized);
        assert_eq!(features.secondary, None);
    }
}
