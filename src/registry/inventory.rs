//! Built-in IPA inventory with X-SAMPA and ARPABET aliases.

use super::features::{Backness, Features, Height, Manner, Place, SecondaryArticulation};
use super::{Diacritic, DiacriticEffect, Notation, SymbolEntry};
use crate::defaults::PLACEHOLDER_GLYPH;
use std::collections::BTreeMap;

use Backness::{Back, Central, Front};
use Height::{Close, CloseMid, Mid, NearClose, NearOpen, Open, OpenMid};
use Manner::{Affricate, Approximant, Fricative, LateralApproximant, Nasal, Plosive, Tap, Trill};
use Place::{
    Alveolar, Bilabial, Dental, Glottal, LabialVelar, Labiodental, Palatal, Pharyngeal,
    Postalveolar, Retroflex, Uvular, Velar,
};

fn entry(glyph: &str, xsampa: &str, arpabet: Option<&str>, features: Features) -> SymbolEntry {
    let mut aliases = BTreeMap::new();
    aliases.insert(Notation::XSampa, xsampa.to_string());
    if let Some(arpabet) = arpabet {
        aliases.insert(Notation::Arpabet, arpabet.to_string());
    }
    SymbolEntry {
        glyph: glyph.to_string(),
        aliases,
        features,
        placeholder: false,
    }
}

fn c(
    glyph: &str,
    xsampa: &str,
    arpabet: Option<&str>,
    place: Place,
    manner: Manner,
    voiced: bool,
) -> SymbolEntry {
    entry(glyph, xsampa, arpabet, Features::consonant(place, manner, voiced))
}

fn v(
    glyph: &str,
    xsampa: &str,
    arpabet: Option<&str>,
    height: Height,
    backness: Backness,
    rounded: bool,
) -> SymbolEntry {
    entry(glyph, xsampa, arpabet, Features::vowel(height, backness, rounded))
}

fn nasal_v(glyph: &str, xsampa: &str, height: Height, backness: Backness, rounded: bool) -> SymbolEntry {
    entry(
        glyph,
        xsampa,
        None,
        Features::vowel(height, backness, rounded).nasalized(),
    )
}

/// The designated fallback entry.
pub fn placeholder() -> SymbolEntry {
    SymbolEntry {
        glyph: PLACEHOLDER_GLYPH.to_string(),
        aliases: BTreeMap::new(),
        features: Features::default(),
        placeholder: true,
    }
}

/// Built-in symbol inventory, placeholder last.
pub fn builtin_symbols() -> Vec<SymbolEntry> {
    vec![
        // Plosives
        c("p", "p", Some("P"), Bilabial, Plosive, false),
        c("b", "b", Some("B"), Bilabial, Plosive, true),
        c("t", "t", Some("T"), Alveolar, Plosive, false),
        c("d", "d", Some("D"), Alveolar, Plosive, true),
        c("ʈ", "t`", None, Retroflex, Plosive, false),
        c("ɖ", "d`", None, Retroflex, Plosive, true),
        c("c", "c", None, Palatal, Plosive, false),
        c("ɟ", "J\\", None, Palatal, Plosive, true),
        c("k", "k", Some("K"), Velar, Plosive, false),
        c("ɡ", "g", Some("G"), Velar, Plosive, true),
        c("q", "q", None, Uvular, Plosive, false),
        c("ʔ", "?", Some("Q"), Glottal, Plosive, false),
        // Nasals
        c("m", "m", Some("M"), Bilabial, Nasal, true),
        c("ɱ", "F", None, Labiodental, Nasal, true),
        c("n", "n", Some("N"), Alveolar, Nasal, true),
        c("ɳ", "n`", None, Retroflex, Nasal, true),
        c("ɲ", "J", None, Palatal, Nasal, true),
        c("ŋ", "N", Some("NG"), Velar, Nasal, true),
        c("ɴ", "N\\", None, Uvular, Nasal, true),
        // Trills and taps
        c("ʙ", "B\\", None, Bilabial, Trill, true),
        c("r", "r", None, Alveolar, Trill, true),
        c("ʀ", "R\\", None, Uvular, Trill, true),
        c("ɾ", "4", Some("DX"), Alveolar, Tap, true),
        c("ɽ", "r`", None, Retroflex, Tap, true),
        // Fricatives
        c("ɸ", "p\\", None, Bilabial, Fricative, false),
        c("β", "B", None, Bilabial, Fricative, true),
        c("f", "f", Some("F"), Labiodental, Fricative, false),
        c("v", "v", Some("V"), Labiodental, Fricative, true),
        c("θ", "T", Some("TH"), Dental, Fricative, false),
        c("ð", "D", Some("DH"), Dental, Fricative, true),
        c("s", "s", Some("S"), Alveolar, Fricative, false),
        c("z", "z", Some("Z"), Alveolar, Fricative, true),
        c("ʃ", "S", Some("SH"), Postalveolar, Fricative, false),
        c("ʒ", "Z", Some("ZH"), Postalveolar, Fricative, true),
        c("ʂ", "s`", None, Retroflex, Fricative, false),
        c("ʐ", "z`", None, Retroflex, Fricative, true),
        c("ç", "C", None, Palatal, Fricative, false),
        c("ʝ", "j\\", None, Palatal, Fricative, true),
        c("x", "x", None, Velar, Fricative, false),
        c("ɣ", "G", None, Velar, Fricative, true),
        c("χ", "X", None, Uvular, Fricative, false),
        c("ʁ", "R", None, Uvular, Fricative, true),
        c("ħ", "X\\", None, Pharyngeal, Fricative, false),
        c("ʕ", "?\\", None, Pharyngeal, Fricative, true),
        c("h", "h", Some("HH"), Glottal, Fricative, false),
        c("ɦ", "h\\", None, Glottal, Fricative, true),
        // Affricates
        c("t\u{361}s", "ts", None, Alveolar, Affricate, false),
        c("d\u{361}z", "dz", None, Alveolar, Affricate, true),
        c("t\u{361}ʃ", "tS", Some("CH"), Postalveolar, Affricate, false),
        c("d\u{361}ʒ", "dZ", Some("JH"), Postalveolar, Affricate, true),
        // Approximants
        c("ʋ", "P", None, Labiodental, Approximant, true),
        c("ɹ", "r\\", Some("R"), Alveolar, Approximant, true),
        c("ɻ", "r\\`", None, Retroflex, Approximant, true),
        c("j", "j", Some("Y"), Palatal, Approximant, true),
        c("ɰ", "M\\", None, Velar, Approximant, true),
        c("w", "w", Some("W"), LabialVelar, Approximant, true),
        c("ʍ", "W", Some("WH"), LabialVelar, Approximant, false),
        // Laterals
        c("l", "l", Some("L"), Alveolar, LateralApproximant, true),
        c("ɭ", "l`", None, Retroflex, LateralApproximant, true),
        c("ʎ", "L", None, Palatal, LateralApproximant, true),
        c("ʟ", "L\\", None, Velar, LateralApproximant, true),
        entry(
            "ɫ",
            "5",
            None,
            Features::consonant(Alveolar, LateralApproximant, true)
                .with_secondary(SecondaryArticulation::Velarized),
        ),
        // Close vowels
        v("i", "i", Some("IY"), Close, Front, false),
        v("y", "y", None, Close, Front, true),
        v("ɨ", "1", Some("IX"), Close, Central, false),
        v("ʉ", "}", Some("UX"), Close, Central, true),
        v("ɯ", "M", None, Close, Back, false),
        v("u", "u", Some("UW"), Close, Back, true),
        v("ɪ", "I", Some("IH"), NearClose, Front, false),
        v("ʏ", "Y", None, NearClose, Front, true),
        v("ʊ", "U", Some("UH"), NearClose, Back, true),
        // Mid vowels
        v("e", "e", None, CloseMid, Front, false),
        v("ø", "2", None, CloseMid, Front, true),
        v("ɘ", "@\\", None, CloseMid, Central, false),
        v("ɵ", "8", None, CloseMid, Central, true),
        v("ɤ", "7", None, CloseMid, Back, false),
        v("o", "o", None, CloseMid, Back, true),
        v("ə", "@", Some("AX"), Mid, Central, false),
        v("ɚ", "@`", Some("AXR"), Mid, Central, false),
        v("ɛ", "E", Some("EH"), OpenMid, Front, false),
        v("œ", "9", None, OpenMid, Front, true),
        v("ɜ", "3", None, OpenMid, Central, false),
        v("ɝ", "3`", Some("ER"), OpenMid, Central, false),
        v("ɞ", "3\\", None, OpenMid, Central, true),
        v("ʌ", "V", Some("AH"), OpenMid, Back, false),
        v("ɔ", "O", Some("AO"), OpenMid, Back, true),
        // Open vowels
        v("æ", "{", Some("AE"), NearOpen, Front, false),
        v("ɐ", "6", None, NearOpen, Central, false),
        v("a", "a", None, Open, Front, false),
        v("ɶ", "&", None, Open, Front, true),
        v("ɑ", "A", Some("AA"), Open, Back, false),
        v("ɒ", "Q", None, Open, Back, true),
        // Nasal vowels
        nasal_v("i\u{303}", "i~", Close, Front, false),
        nasal_v("u\u{303}", "u~", Close, Back, true),
        nasal_v("e\u{303}", "e~", CloseMid, Front, false),
        nasal_v("o\u{303}", "o~", CloseMid, Back, true),
        nasal_v("ɛ\u{303}", "E~", OpenMid, Front, false),
        nasal_v("œ\u{303}", "9~", OpenMid, Front, true),
        nasal_v("ɔ\u{303}", "O~", OpenMid, Back, true),
        nasal_v("a\u{303}", "a~", Open, Front, false),
        nasal_v("ɑ\u{303}", "A~", Open, Back, false),
        // Diphthongs, featured by their nucleus
        v("aɪ", "aI", Some("AY"), Open, Front, false),
        v("aʊ", "aU", Some("AW"), Open, Front, false),
        v("eɪ", "eI", Some("EY"), CloseMid, Front, false),
        v("oʊ", "oU", Some("OW"), CloseMid, Back, true),
        v("ɔɪ", "OI", Some("OY"), OpenMid, Back, true),
        placeholder(),
    ]
}

fn d(mark: &str, xsampa: &str, effect: DiacriticEffect) -> Diacritic {
    Diacritic {
        mark: mark.to_string(),
        xsampa: xsampa.to_string(),
        effect,
    }
}

/// Built-in diacritic table.
pub fn builtin_diacritics() -> Vec<Diacritic> {
    use DiacriticEffect::*;
    vec![
        d("ʰ", "_h", Aspirated),
        d("ʷ", "_w", Secondary(SecondaryArticulation::Labialized)),
        d("ʲ", "_j", Secondary(SecondaryArticulation::Palatalized)),
        d("ˠ", "_G", Secondary(SecondaryArticulation::Velarized)),
        d("ˤ", "_?\\", Secondary(SecondaryArticulation::Pharyngealized)),
        d("\u{303}", "~", Nasalized),
        d("\u{325}", "_0", Devoiced),
        d("\u{329}", "=", Syllabic),
        d("\u{31A}", "_}", Unreleased),
        d("\u{32A}", "_d", Dental),
        d("ʼ", "_>", Ejective),
        d("ː", ":", Long),
        d("ˑ", ":\\", HalfLong),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_builtin_glyphs_are_unique() {
        let symbols = builtin_symbols();
        let glyphs: HashSet<&str> = symbols.iter().map(|s| s.glyph.as_str()).collect();
        assert_eq!(glyphs.len(), symbols.len());
    }

    #[test]
    fn test_exactly_one_builtin_placeholder() {
        let count = builtin_symbols().iter().filter(|s| s.placeholder).count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_arpabet_covers_cmudict_phones() {
        let arpabet: HashSet<String> = builtin_symbols()
            .iter()
            .filter_map(|s| s.aliases.get(&Notation::Arpabet).cloned())
            .collect();
        for phone in [
            "AA", "AE", "AH", "AO", "AW", "AY", "B", "CH", "D", "DH", "EH", "ER", "EY", "F", "G",
            "HH", "IH", "IY", "JH", "K", "L", "M", "N", "NG", "OW", "OY", "P", "R", "S", "SH",
            "T", "TH", "UH", "UW", "V", "W", "Y", "Z", "ZH",
        ] {
            assert!(arpabet.contains(phone), "missing ARPABET phone {phone}");
        }
    }

    #[test]
    fn test_diacritic_marks_are_unique() {
        let diacritics = builtin_diacritics();
        let marks: HashSet<&str> = diacritics.iter().map(|d| d.mark.as_str()).collect();
        let xsampa: HashSet<&str> = diacritics.iter().map(|d| d.xsampa.as_str()).collect();
        assert_eq!(marks.len(), diacritics.len());
        assert_eq!(xsampa.len(), diacritics.len());
    }
}
