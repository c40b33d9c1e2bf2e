use serde::Serialize;

use crate::dictionary::PronunciationDictionary;

pub const NOT_FOUND: &str = "Not found";
pub const NO_ALTERNATES: &str = "無し";
pub const SEPARATOR: &str = "・";
const ALTERNATE_SEPARATOR: &str = "/";

/// Characters passed through as themselves instead of being looked up.
const SKIP_CHARS: &[char] = &[
    ' ', '\u{3000}', '\t', '\n', '、', '。', '，', ',', '.', '！', '!', '？', '?', '：', ':',
    '；', ';', '「', '」', '『', '』', '（', '）', '(', ')', '[', ']', '【', '】', '〈', '〉', '《',
    '》', '{', '}', '|', '｜', '/', '／', '・', '…', '〜', '~', '-', 'ー', '"', '\'', '“', '”',
    '‘', '’',
];

pub fn is_skip_char(ch: char) -> bool {
    SKIP_CHARS.contains(&ch)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CharAnnotation {
    #[serde(rename = "char")]
    pub ch: char,
    pub romanizations: Vec<String>,
    pub transliterations: Vec<String>,
}

impl CharAnnotation {
    fn primary_romanization(&self) -> &str {
        self.romanizations.first().map(String::as_str).unwrap_or(NOT_FOUND)
    }

    fn primary_transliteration(&self) -> &str {
        self.transliterations
            .first()
            .map(String::as_str)
            .unwrap_or(NOT_FOUND)
    }
}

/// Per-character readings of one phrase, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PhraseAnnotation {
    pub chars: Vec<CharAnnotation>,
}

impl PhraseAnnotation {
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn jyutping(&self) -> String {
        self.join_primary(CharAnnotation::primary_romanization)
    }

    pub fn katakana(&self) -> String {
        self.join_primary(CharAnnotation::primary_transliteration)
    }

    pub fn jyutping_multi(&self) -> String {
        join_alternates(self.chars.iter().map(|entry| entry.romanizations.as_slice()))
    }

    pub fn katakana_multi(&self) -> String {
        join_alternates(
            self.chars
                .iter()
                .map(|entry| entry.transliterations.as_slice()),
        )
    }

    fn join_primary(&self, primary: fn(&CharAnnotation) -> &str) -> String {
        self.chars
            .iter()
            .map(primary)
            .collect::<Vec<_>>()
            .join(SEPARATOR)
    }
}

fn join_alternates<'a>(entries: impl Iterator<Item = &'a [String]>) -> String {
    entries
        .map(|values| match values.get(1..) {
            Some(rest) if !rest.is_empty() => rest.join(ALTERNATE_SEPARATOR),
            _ => NO_ALTERNATES.to_string(),
        })
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

/// Annotates every code point of `phrase`; characters missing from the
/// dictionary get [`NOT_FOUND`] without interrupting the rest.
pub fn annotate(dictionary: &PronunciationDictionary, phrase: &str) -> PhraseAnnotation {
    let chars = phrase
        .chars()
        .map(|ch| annotate_char(dictionary, ch))
        .collect();
    PhraseAnnotation { chars }
}

fn annotate_char(dictionary: &PronunciationDictionary, ch: char) -> CharAnnotation {
    if is_skip_char(ch) {
        return CharAnnotation {
            ch,
            romanizations: vec![ch.to_string()],
            transliterations: vec![ch.to_string()],
        };
    }
    let romanizations = match dictionary.romanizations(ch) {
        Some(list) => list.to_vec(),
        None => vec![NOT_FOUND.to_string()],
    };
    let transliterations = romanizations
        .iter()
        .map(|reading| {
            dictionary
                .transliterate(reading)
                .unwrap_or_else(|| NOT_FOUND.to_string())
        })
        .collect();
    CharAnnotation {
        ch,
        romanizations,
        transliterations,
    }
}
