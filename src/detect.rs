use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::settings::GuardSettings;

static NON_CONTENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{P}\p{S}\p{Z}\s]+").expect("non-content pattern"));

pub fn is_kana(ch: char) -> bool {
    matches!(ch, '\u{3040}'..='\u{309F}' | '\u{30A0}'..='\u{30FF}')
}

pub fn contains_kana(text: &str) -> bool {
    text.chars().any(is_kana)
}

/// Japanese iff the text has at least one hiragana or katakana character.
///
/// Han characters alone say nothing: traditional Cantonese and Japanese kanji
/// share the same code points.
pub fn is_japanese_text(text: &str) -> bool {
    contains_kana(text)
}

/// Strips punctuation, symbols and whitespace before comparing two strings.
pub fn comparison_form(text: &str) -> String {
    NON_CONTENT.replace_all(text, "").into_owned()
}

/// Share of positions holding the same character, over the shorter length.
pub fn positional_similarity(left: &str, right: &str) -> f64 {
    let left = left.chars().collect::<Vec<_>>();
    let right = right.chars().collect::<Vec<_>>();
    let shorter = left.len().min(right.len());
    if shorter == 0 {
        return 0.0;
    }
    let matches = left
        .iter()
        .zip(right.iter())
        .filter(|(a, b)| a == b)
        .count();
    matches as f64 / shorter as f64
}

#[derive(Debug, Clone, PartialEq)]
pub struct GuardVerdict {
    pub similarity: f64,
    pub mostly_unchanged: bool,
    pub particle: Option<char>,
    pub revert: bool,
}

/// Detects a "translation" of text that was already Cantonese.
#[derive(Debug, Clone)]
pub struct TranslationGuard {
    similarity_threshold: f64,
    min_length: usize,
    particles: Vec<char>,
}

impl TranslationGuard {
    pub fn new(settings: &GuardSettings) -> Self {
        Self {
            similarity_threshold: settings.similarity_threshold,
            min_length: settings.min_length,
            particles: settings.particles.chars().collect(),
        }
    }

    pub fn find_particle(&self, text: &str) -> Option<char> {
        text.chars().find(|ch| self.particles.contains(ch))
    }

    pub fn inspect(&self, original: &str, translated: &str) -> GuardVerdict {
        let left = comparison_form(original);
        let right = comparison_form(translated);
        let similarity = positional_similarity(&left, &right);
        let mostly_unchanged = left == right
            || left.contains(right.as_str())
            || right.contains(left.as_str())
            || similarity >= self.similarity_threshold;
        let particle = self.find_particle(original);
        let flagged = mostly_unchanged || particle.is_some();
        let long_enough = original.chars().count() >= self.min_length;
        let revert = flagged && (particle.is_some() || (long_enough && mostly_unchanged));
        debug!(
            similarity,
            mostly_unchanged,
            particle = ?particle,
            revert,
            "translation guard verdict"
        );
        GuardVerdict {
            similarity,
            mostly_unchanged,
            particle,
            revert,
        }
    }
}

impl Default for TranslationGuard {
    fn default() -> Self {
        Self::new(&GuardSettings::default())
    }
}
