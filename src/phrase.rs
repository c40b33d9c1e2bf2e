use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::annotate::{PhraseAnnotation, annotate};
use crate::detect::{TranslationGuard, contains_kana, is_japanese_text};
use crate::dictionary::PronunciationDictionary;
use crate::error::TranslateError;
use crate::providers::Provider;
use crate::translator::{Direction, ExampleSentence, Translator, normalize_input};

/// Which language the caller says the phrase is in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SourceLanguage {
    #[default]
    Auto,
    Japanese,
    Cantonese,
}

impl SourceLanguage {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Some(SourceLanguage::Auto),
            "ja" | "jpn" | "japanese" => Some(SourceLanguage::Japanese),
            "yue" | "cantonese" | "zh-hk" => Some(SourceLanguage::Cantonese),
            _ => None,
        }
    }

    fn treats_as_japanese(self, text: &str) -> bool {
        match self {
            SourceLanguage::Auto => is_japanese_text(text),
            SourceLanguage::Japanese => true,
            SourceLanguage::Cantonese => false,
        }
    }
}

/// The phrase that gets annotated, and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationResult {
    pub cantonese_phrase: String,
    /// Set only when a translation happened and was kept.
    pub original_japanese: Option<String>,
    pub japanese_translation: String,
}

/// Payload of a successful process-phrase request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhraseOutput {
    pub jyutping: String,
    pub katakana: String,
    pub jyutping_multi: String,
    pub katakana_multi: String,
    pub example_cantonese: String,
    pub example_japanese: String,
    pub example_full: String,
    pub original_text: Option<String>,
    pub translated_text: Option<String>,
    pub japanese_translation: String,
}

impl PhraseOutput {
    fn assemble(
        annotation: &PhraseAnnotation,
        translation: TranslationResult,
        example: ExampleSentence,
    ) -> Self {
        let translated_text = translation
            .original_japanese
            .as_ref()
            .map(|_| translation.cantonese_phrase.clone());
        Self {
            jyutping: annotation.jyutping(),
            katakana: annotation.katakana(),
            jyutping_multi: annotation.jyutping_multi(),
            katakana_multi: annotation.katakana_multi(),
            example_cantonese: example.cantonese,
            example_japanese: example.japanese,
            example_full: example.full,
            original_text: translation.original_japanese,
            translated_text,
            japanese_translation: translation.japanese_translation,
        }
    }
}

/// Turns a Japanese or Cantonese phrase into Cantonese with readings.
///
/// Holds only read-only state, so one processor serves every request.
#[derive(Debug, Clone)]
pub struct PhraseProcessor<P: Provider> {
    dictionary: Arc<PronunciationDictionary>,
    translator: Translator<P>,
    guard: TranslationGuard,
}

impl<P: Provider> PhraseProcessor<P> {
    pub fn new(
        dictionary: Arc<PronunciationDictionary>,
        translator: Translator<P>,
        guard: TranslationGuard,
    ) -> Self {
        Self {
            dictionary,
            translator,
            guard,
        }
    }

    pub fn dictionary(&self) -> &PronunciationDictionary {
        &self.dictionary
    }

    pub fn translator(&self) -> &Translator<P> {
        &self.translator
    }

    pub fn annotate(&self, phrase: &str) -> PhraseAnnotation {
        annotate(&self.dictionary, &normalize_input(phrase))
    }

    /// Runs the whole flow. Only a failed Japanese-to-Cantonese translation
    /// is an error; the back-translation and example sentence degrade to
    /// empty strings.
    pub async fn process(
        &self,
        phrase: &str,
        source: SourceLanguage,
    ) -> Result<PhraseOutput, TranslateError> {
        let text = normalize_input(phrase);
        let japanese = source.treats_as_japanese(&text);
        debug!(phrase = %text, japanese, "processing phrase");

        let (cantonese_phrase, original_japanese) = if japanese {
            let translated = self
                .translator
                .translate(&text, Direction::JapaneseToCantonese)
                .await?;
            if !contains_kana(&text) && self.guard.inspect(&text, &translated).revert {
                info!(phrase = %text, "input already looks Cantonese; discarding translation");
                (text.clone(), None)
            } else {
                (translated, Some(text.clone()))
            }
        } else {
            (text.clone(), None)
        };

        let annotation = annotate(&self.dictionary, &cantonese_phrase);

        let japanese_translation = match original_japanese.as_deref() {
            Some(original) => original.to_string(),
            None => self.back_translation(&cantonese_phrase).await,
        };
        let example = match original_japanese.as_deref() {
            Some(original) => ExampleSentence::from_pair(&cantonese_phrase, original),
            None => self.example_sentence(&cantonese_phrase).await,
        };

        let translation = TranslationResult {
            cantonese_phrase,
            original_japanese,
            japanese_translation,
        };
        Ok(PhraseOutput::assemble(&annotation, translation, example))
    }

    async fn back_translation(&self, cantonese: &str) -> String {
        if cantonese.is_empty() {
            return String::new();
        }
        match self
            .translator
            .translate(cantonese, Direction::CantoneseToJapanese)
            .await
        {
            Ok(translation) => translation,
            Err(err) => {
                warn!("back-translation failed: {}", err);
                String::new()
            }
        }
    }

    async fn example_sentence(&self, cantonese: &str) -> ExampleSentence {
        if cantonese.is_empty() {
            return ExampleSentence::default();
        }
        match self.translator.example_sentence(cantonese).await {
            Ok(example) => example,
            Err(err) => {
                warn!("example sentence generation failed: {}", err);
                ExampleSentence::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{DictionarySettings, TranslationSettings};
    use crate::translator::tests::{ScriptedProvider, scripted};

    fn dictionary() -> Arc<PronunciationDictionary> {
        Arc::new(PronunciationDictionary::bundled().expect("bundled dictionary"))
    }

    fn processor(
        replies: Vec<Option<&str>>,
    ) -> (PhraseProcessor<ScriptedProvider>, ScriptedProvider) {
        let (translator, provider) = scripted(replies);
        let processor =
            PhraseProcessor::new(dictionary(), translator, TranslationGuard::default());
        (processor, provider)
    }

    #[tokio::test]
    async fn cantonese_input_is_annotated_directly() {
        let (processor, provider) = processor(vec![
            Some("こんにちは"),
            Some("你好呀！（こんにちは！）"),
        ]);
        let output = processor
            .process("你好", SourceLanguage::Auto)
            .await
            .expect("output");
        assert_eq!(output.jyutping, "nei5・hou2");
        assert_eq!(output.katakana, "ネイ5・ホウ2");
        assert_eq!(output.jyutping_multi, "無し・hou3");
        assert_eq!(output.original_text, None);
        assert_eq!(output.translated_text, None);
        assert_eq!(output.japanese_translation, "こんにちは");
        assert_eq!(output.example_cantonese, "你好呀！");
        assert_eq!(output.example_japanese, "こんにちは！");

        let calls = provider.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].user.starts_with("次の広東語を日本語に"));
    }

    #[tokio::test]
    async fn japanese_input_is_translated_first() {
        let (processor, provider) = processor(vec![Some("你好")]);
        let output = processor
            .process("こんにちは", SourceLanguage::Auto)
            .await
            .expect("output");
        assert_eq!(output.original_text.as_deref(), Some("こんにちは"));
        assert_eq!(output.translated_text.as_deref(), Some("你好"));
        assert_eq!(output.jyutping, "nei5・hou2");
        assert_eq!(output.japanese_translation, "こんにちは");
        assert_eq!(output.example_cantonese, "你好");
        assert_eq!(output.example_japanese, "こんにちは");
        assert_eq!(output.example_full, "你好（こんにちは）");
        // the example sentence is reused, not generated
        assert_eq!(provider.calls().len(), 1);
    }

    #[tokio::test]
    async fn failed_translation_of_japanese_is_an_error() {
        let (processor, _) = processor(vec![None]);
        let err = processor
            .process("ありがとう", SourceLanguage::Auto)
            .await
            .unwrap_err();
        assert!(matches!(err, TranslateError::Upstream { .. }));
    }

    #[tokio::test]
    async fn unknown_characters_are_marked_not_found() {
        let (processor, _) = processor(vec![Some(""), Some("")]);
        let output = processor
            .process("你★好", SourceLanguage::Cantonese)
            .await
            .expect("output");
        assert_eq!(output.jyutping, "nei5・Not found・hou2");
        assert_eq!(output.katakana, "ネイ5・Not found・ホウ2");
    }

    #[tokio::test]
    async fn forced_japanese_cantonese_with_particle_is_reverted() {
        let original = "我哋今日去咗公園行街，之後返屋企食飯嘅時候好開心";
        assert!(original.chars().count() >= 20);
        let (processor, _) = processor(vec![Some(original), Some("訳"), Some("例")]);
        let output = processor
            .process(original, SourceLanguage::Japanese)
            .await
            .expect("output");
        assert_eq!(output.original_text, None);
        assert_eq!(output.translated_text, None);
        assert_eq!(output.japanese_translation, "訳");
        assert!(output.jyutping.starts_with("ngo5・dei6"));
    }

    #[tokio::test]
    async fn forced_japanese_kanji_translation_is_kept() {
        let (processor, _) = processor(vec![Some("天氣好好")]);
        let output = processor
            .process("晴天", SourceLanguage::Japanese)
            .await
            .expect("output");
        assert_eq!(output.original_text.as_deref(), Some("晴天"));
        assert_eq!(output.translated_text.as_deref(), Some("天氣好好"));
    }

    #[tokio::test]
    async fn auxiliary_failures_leave_fields_empty() {
        let (processor, _) = processor(vec![None, None]);
        let output = processor
            .process("早晨", SourceLanguage::Auto)
            .await
            .expect("output");
        assert_eq!(output.jyutping, "zou2・san4");
        assert_eq!(output.japanese_translation, "");
        assert_eq!(output.example_full, "");
    }

    #[tokio::test]
    async fn empty_phrase_makes_no_calls() {
        let (processor, provider) = processor(vec![]);
        let output = processor
            .process("   ", SourceLanguage::Auto)
            .await
            .expect("output");
        assert_eq!(output.jyutping, "");
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn unconfigured_translator_still_annotates_cantonese() {
        let translator: Translator<ScriptedProvider> =
            Translator::new(None, TranslationSettings::default());
        let dictionary = PronunciationDictionary::load(&DictionarySettings::default())
            .expect("dictionary");
        let processor =
            PhraseProcessor::new(Arc::new(dictionary), translator, TranslationGuard::default());
        let output = processor
            .process("多謝", SourceLanguage::Auto)
            .await
            .expect("output");
        assert_eq!(output.jyutping, "do1・ze6");
        assert_eq!(output.japanese_translation, "");

        let err = processor
            .process("ありがとう", SourceLanguage::Auto)
            .await
            .unwrap_err();
        assert!(matches!(err, TranslateError::MissingKey { .. }));
    }

    #[test]
    fn source_language_names() {
        assert_eq!(SourceLanguage::parse("JA"), Some(SourceLanguage::Japanese));
        assert_eq!(SourceLanguage::parse(""), Some(SourceLanguage::Auto));
        assert_eq!(SourceLanguage::parse("yue"), Some(SourceLanguage::Cantonese));
        assert_eq!(SourceLanguage::parse("fr"), None);
    }
}
