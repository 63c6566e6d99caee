//! Built-in allophone rule sets.

use super::rule::{AllophoneRule, BOUNDARY, FeatureClass, Pattern, Replacement};
use crate::registry::features::Place;

fn symbol(glyph: &str) -> Pattern {
    Pattern::Symbol(glyph.to_string())
}

fn any_of(glyphs: &[&str]) -> Pattern {
    Pattern::AnyOf(glyphs.iter().map(|g| g.to_string()).collect())
}

fn vowel() -> Pattern {
    Pattern::Class(FeatureClass::vowel())
}

fn velar_consonant() -> Pattern {
    Pattern::Class(FeatureClass::consonant().with_place(Place::Velar))
}

fn rule(
    id: &str,
    language: &str,
    priority: i32,
    trigger: Pattern,
    context: (Option<Pattern>, Option<Pattern>),
    replace: Replacement,
    description: &str,
) -> AllophoneRule {
    AllophoneRule {
        id: id.to_string(),
        language: Some(language.to_string()),
        priority,
        trigger,
        preceded_by: context.0,
        followed_by: context.1,
        replace,
        description: Some(description.to_string()),
    }
}

fn to(glyph: &str) -> Replacement {
    Replacement::Symbol(glyph.to_string())
}

/// Rules shipped with the crate, in declaration order.
pub fn builtin_rules() -> Vec<AllophoneRule> {
    vec![
        // English
        rule(
            "en-nasal-velar",
            "en",
            10,
            symbol("n"),
            (None, Some(velar_consonant())),
            to("ŋ"),
            "n assimilates to a following velar",
        ),
        rule(
            "en-aspiration",
            "en",
            20,
            any_of(&["p", "t", "k"]),
            (Some(symbol(BOUNDARY)), Some(vowel())),
            Replacement::Diacritic("ʰ".to_string()),
            "utterance-initial voiceless stops are aspirated",
        ),
        rule(
            "en-flap",
            "en",
            20,
            any_of(&["t", "d"]),
            (Some(vowel()), Some(vowel())),
            to("ɾ"),
            "alveolar stops flap between vowels",
        ),
        rule(
            "en-dark-l",
            "en",
            30,
            symbol("l"),
            (None, Some(symbol(BOUNDARY))),
            to("ɫ"),
            "final l is velarized",
        ),
        // Spanish
        rule(
            "es-nasal-velar",
            "es",
            10,
            symbol("n"),
            (None, Some(velar_consonant())),
            to("ŋ"),
            "n assimilates to a following velar",
        ),
        rule(
            "es-spirant-b",
            "es",
            20,
            symbol("b"),
            (Some(vowel()), None),
            to("β"),
            "b spirantizes after a vowel",
        ),
        rule(
            "es-spirant-d",
            "es",
            20,
            symbol("d"),
            (Some(vowel()), None),
            to("ð"),
            "d spirantizes after a vowel",
        ),
        rule(
            "es-spirant-g",
            "es",
            20,
            symbol("\u{261}"),
            (Some(vowel()), None),
            to("ɣ"),
            "g spirantizes after a vowel",
        ),
        // German
        rule(
            "de-final-devoicing",
            "de",
            10,
            any_of(&["b", "d", "\u{261}", "v", "z"]),
            (None, Some(symbol(BOUNDARY))),
            Replacement::Diacritic("\u{325}".to_string()),
            "final obstruents devoice",
        ),
    ]
}
