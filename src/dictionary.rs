use anyhow::{Context, Result, anyhow};
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

use crate::settings::DictionarySettings;

const BUNDLED_JYUTPING_TSV: &str = include_str!("../data/jyutping.tsv");
const BUNDLED_KATAKANA_JSON: &str = include_str!("../data/katakana.json");

static TONE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d)$").expect("tone suffix pattern"));

/// Character to Jyutping readings, plus Jyutping base to katakana respelling.
///
/// Built once at startup and shared read-only between requests.
#[derive(Debug, Clone, Default)]
pub struct PronunciationDictionary {
    romanizations: HashMap<char, Vec<String>>,
    transliterations: HashMap<String, String>,
}

impl PronunciationDictionary {
    /// Loads the configured tables, falling back to the bundled data for any
    /// table without a configured path.
    pub fn load(settings: &DictionarySettings) -> Result<Self> {
        let tsv = match settings.jyutping_path.as_deref() {
            Some(path) => read_table(path)?,
            None => BUNDLED_JYUTPING_TSV.to_string(),
        };
        let json = match settings.katakana_path.as_deref() {
            Some(path) => read_table(path)?,
            None => BUNDLED_KATAKANA_JSON.to_string(),
        };
        let dictionary = Self::from_sources(&tsv, &json, settings)?;
        debug!(
            "loaded pronunciation dictionary: {} characters, {} transliteration bases",
            dictionary.romanizations.len(),
            dictionary.transliterations.len()
        );
        Ok(dictionary)
    }

    pub fn bundled() -> Result<Self> {
        Self::from_sources(
            BUNDLED_JYUTPING_TSV,
            BUNDLED_KATAKANA_JSON,
            &DictionarySettings::default(),
        )
    }

    pub fn from_sources(tsv: &str, json: &str, settings: &DictionarySettings) -> Result<Self> {
        let romanizations = parse_romanizations(
            tsv,
            &settings.character_column,
            &settings.romanization_column,
        )?;
        let transliterations: HashMap<String, String> =
            serde_json::from_str(json).with_context(|| "failed to parse transliteration map")?;
        Ok(Self {
            romanizations,
            transliterations,
        })
    }

    /// Readings for `ch` in dictionary file order.
    pub fn romanizations(&self, ch: char) -> Option<&[String]> {
        self.romanizations
            .get(&ch)
            .map(Vec::as_slice)
            .filter(|list| !list.is_empty())
    }

    /// Looks up the respelling of a reading's base and carries its tone digit
    /// over, e.g. `nei5` -> `ネイ5`.
    pub fn transliterate(&self, romanization: &str) -> Option<String> {
        let (base, tone) = split_tone(romanization);
        self.transliterations
            .get(base)
            .map(|value| format!("{}{}", value, tone.unwrap_or("")))
    }

    pub fn character_count(&self) -> usize {
        self.romanizations.len()
    }
}

pub fn split_tone(romanization: &str) -> (&str, Option<&str>) {
    match TONE_SUFFIX.find(romanization) {
        Some(tone) => (&romanization[..tone.start()], Some(tone.as_str())),
        None => (romanization, None),
    }
}

fn read_table(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .with_context(|| format!("failed to read dictionary file: {}", path.display()))
}

fn parse_romanizations(
    tsv: &str,
    character_column: &str,
    romanization_column: &str,
) -> Result<HashMap<char, Vec<String>>> {
    let mut lines = tsv.lines().enumerate();
    let header = lines
        .by_ref()
        .find(|(_, line)| !line.trim().is_empty())
        .map(|(_, line)| line)
        .ok_or_else(|| anyhow!("dictionary table is empty"))?;
    let columns = header
        .split('\t')
        .map(|name| name.trim().trim_start_matches('\u{feff}'))
        .collect::<Vec<_>>();
    let char_index = column_index(&columns, character_column)?;
    let reading_index = column_index(&columns, romanization_column)?;

    let mut map: HashMap<char, Vec<String>> = HashMap::new();
    for (index, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        let cells = line.split('\t').collect::<Vec<_>>();
        let (Some(cell), Some(reading)) = (cells.get(char_index), cells.get(reading_index)) else {
            return Err(anyhow!(
                "dictionary row {} has {} columns, expected at least {}",
                index + 1,
                cells.len(),
                char_index.max(reading_index) + 1
            ));
        };
        let reading = reading.trim();
        let mut chars = cell.trim().chars();
        let (Some(ch), None) = (chars.next(), chars.next()) else {
            continue;
        };
        if reading.is_empty() {
            continue;
        }
        map.entry(ch).or_default().push(reading.to_string());
    }
    Ok(map)
}

fn column_index(columns: &[&str], name: &str) -> Result<usize> {
    columns
        .iter()
        .position(|column| *column == name)
        .ok_or_else(|| anyhow!("dictionary table has no '{}' column", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TSV: &str = "char\tjyutping\n行\thang4\n行\thong4\n你\tnei5\n行\thang4\n";
    const JSON: &str = r#"{"hang": "ハン", "hong": "ホン", "nei": "ネイ", "hang": "ハング"}"#;

    fn fixture() -> PronunciationDictionary {
        PronunciationDictionary::from_sources(TSV, JSON, &DictionarySettings::default())
            .expect("fixture dictionary")
    }

    #[test]
    fn repeated_characters_append_in_file_order() {
        let dictionary = fixture();
        assert_eq!(
            dictionary.romanizations('行').expect("readings"),
            ["hang4", "hong4", "hang4"]
        );
        assert_eq!(dictionary.romanizations('你').expect("readings"), ["nei5"]);
        assert!(dictionary.romanizations('我').is_none());
    }

    #[test]
    fn lookups_are_stable_across_calls() {
        let dictionary = fixture();
        let first = dictionary.romanizations('行').map(<[String]>::to_vec);
        let second = dictionary.romanizations('行').map(<[String]>::to_vec);
        assert_eq!(first, second);
    }

    #[test]
    fn last_transliteration_wins() {
        let dictionary = fixture();
        assert_eq!(dictionary.transliterate("hang4").as_deref(), Some("ハング4"));
    }

    #[test]
    fn transliteration_carries_tone_digit() {
        let dictionary = fixture();
        for tone in 1..=6 {
            let reading = format!("nei{}", tone);
            assert_eq!(
                dictionary.transliterate(&reading),
                Some(format!("ネイ{}", tone))
            );
        }
        assert_eq!(dictionary.transliterate("nei").as_deref(), Some("ネイ"));
        assert_eq!(dictionary.transliterate("zzz1"), None);
    }

    #[test]
    fn columns_are_found_by_header_name() {
        let tsv = "freq\tjyutping\tchar\n9\tngo5\t我\n";
        let dictionary =
            PronunciationDictionary::from_sources(tsv, "{}", &DictionarySettings::default())
                .expect("dictionary");
        assert_eq!(dictionary.romanizations('我').expect("readings"), ["ngo5"]);
    }

    #[test]
    fn missing_column_is_an_error() {
        let err = PronunciationDictionary::from_sources(
            "char\treading\n我\tngo5\n",
            "{}",
            &DictionarySettings::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("jyutping"));
    }

    #[test]
    fn short_rows_are_an_error() {
        let err = PronunciationDictionary::from_sources(
            "char\tjyutping\n我\n",
            "{}",
            &DictionarySettings::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("row 2"));
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = DictionarySettings {
            jyutping_path: Some(dir.path().join("missing.tsv")),
            ..DictionarySettings::default()
        };
        let err = PronunciationDictionary::load(&settings).unwrap_err();
        assert!(err.to_string().contains("missing.tsv"));
    }

    #[test]
    fn configured_files_are_read_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tsv = dir.path().join("canto.tsv");
        let json = dir.path().join("kana.json");
        fs::write(&tsv, TSV).expect("write tsv");
        fs::write(&json, JSON).expect("write json");
        let settings = DictionarySettings {
            jyutping_path: Some(tsv),
            katakana_path: Some(json),
            ..DictionarySettings::default()
        };
        let dictionary = PronunciationDictionary::load(&settings).expect("dictionary");
        assert_eq!(dictionary.character_count(), 2);
    }

    #[test]
    fn bundled_data_loads() {
        let dictionary = PronunciationDictionary::bundled().expect("bundled");
        assert_eq!(dictionary.romanizations('好').expect("readings"), ["hou2", "hou3"]);
        assert_eq!(dictionary.transliterate("hou2").as_deref(), Some("ホウ2"));
    }
}
