use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, error};
use unicode_normalization::UnicodeNormalization;

use crate::detect::is_kana;
use crate::error::TranslateError;
use crate::providers::{self, OpenAI, Provider, Sampling};
use crate::settings::TranslationSettings;

const JA_TO_YUE_SYSTEM: &str = "あなたは日本語を香港の広東語に翻訳する専門の翻訳者です。\
繁体字を使い、香港で日常的に話される口語の広東語に自然に訳してください。\
訳文のみを出力し、説明・注釈・引用符は付けないでください。";
const YUE_TO_JA_SYSTEM: &str = "あなたは香港の広東語を日本語に翻訳する専門の翻訳者です。\
自然で分かりやすい日本語に訳してください。\
訳文のみを出力し、説明・注釈・引用符は付けないでください。";
const EXAMPLE_SYSTEM: &str = "あなたは日本人学習者に広東語を教える先生です。\
与えられた広東語の単語やフレーズを使った、日常会話で使える短い例文を一つ作ってください。\
出力は「広東語の例文（日本語訳）」の形式で一行だけにしてください。";

const QUOTE_CHARS: &[char] = &[
    '"', '\'', '`', '「', '」', '『', '』', '“', '”', '‘', '’', '【', '】', '《', '》', '〈', '〉',
];

static LINE_BREAKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*[\r\n]+\s*").expect("line break pattern"));
static PARENTHESIZED_GLOSS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s*[（(](.+)[）)]$").expect("gloss pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    JapaneseToCantonese,
    CantoneseToJapanese,
}

impl Direction {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ja-yue" | "ja-to-yue" => Some(Direction::JapaneseToCantonese),
            "yue-ja" | "yue-to-ja" => Some(Direction::CantoneseToJapanese),
            _ => None,
        }
    }

    fn prompts(self, text: &str) -> (&'static str, String) {
        match self {
            Direction::JapaneseToCantonese => (
                JA_TO_YUE_SYSTEM,
                format!("次の日本語を広東語に翻訳してください。\n\n{}", text),
            ),
            Direction::CantoneseToJapanese => (
                YUE_TO_JA_SYSTEM,
                format!("次の広東語を日本語に翻訳してください。\n\n{}", text),
            ),
        }
    }
}

/// A generated example sentence split into its Cantonese part and gloss.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExampleSentence {
    pub cantonese: String,
    pub japanese: String,
    pub full: String,
}

impl ExampleSentence {
    /// Reuses an existing source/translation pair instead of generating one.
    pub fn from_pair(cantonese: &str, japanese: &str) -> Self {
        Self {
            cantonese: cantonese.to_string(),
            japanese: japanese.to_string(),
            full: format!("{}（{}）", cantonese, japanese),
        }
    }

    pub fn parse(raw: &str) -> Self {
        let full = clean_response(raw);
        if let Some(captures) = PARENTHESIZED_GLOSS.captures(&full) {
            return Self {
                cantonese: captures[1].trim().to_string(),
                japanese: captures[2].trim().to_string(),
                full,
            };
        }
        match full.char_indices().find(|(_, ch)| is_kana(*ch)) {
            Some((index, _)) => Self {
                cantonese: full[..index].trim().to_string(),
                japanese: full[index..].trim().to_string(),
                full,
            },
            None => Self {
                cantonese: full.clone(),
                japanese: String::new(),
                full,
            },
        }
    }
}

/// Japanese/Cantonese translation over a chat-completion [`Provider`].
///
/// Without a provider (no API key configured) every call fails with
/// [`TranslateError::MissingKey`] before anything is sent.
#[derive(Debug, Clone)]
pub struct Translator<P: Provider> {
    provider: Option<P>,
    settings: TranslationSettings,
}

impl Translator<OpenAI> {
    pub fn from_settings(settings: &TranslationSettings) -> Self {
        let provider = providers::get_env(&settings.api_key_env).map(|key| {
            let base_url = providers::get_env("OPENAI_BASE_URL")
                .unwrap_or_else(|| settings.base_url.clone());
            OpenAI::new(key)
                .with_model(settings.model.clone())
                .with_base_url(base_url)
        });
        if provider.is_none() {
            error!(
                "{} is not set; translation requests will fail",
                settings.api_key_env
            );
        }
        Self::new(provider, settings.clone())
    }
}

impl<P: Provider> Translator<P> {
    pub fn new(provider: Option<P>, settings: TranslationSettings) -> Self {
        Self { provider, settings }
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    pub async fn translate(
        &self,
        text: &str,
        direction: Direction,
    ) -> Result<String, TranslateError> {
        let text = normalize_input(text);
        let (system, user) = direction.prompts(&text);
        let sampling = Sampling {
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            top_p: self.settings.top_p,
        };
        let output = self.complete(system, user, sampling).await?;
        let translated = clean_response(&output);
        debug!(?direction, input = %text, output = %translated, "translated");
        Ok(translated)
    }

    pub async fn example_sentence(&self, word: &str) -> Result<ExampleSentence, TranslateError> {
        let word = normalize_input(word);
        let sampling = Sampling {
            max_tokens: self.settings.example_max_tokens,
            temperature: self.settings.example_temperature,
            top_p: self.settings.top_p,
        };
        let output = self.complete(EXAMPLE_SYSTEM, word, sampling).await?;
        Ok(ExampleSentence::parse(&output))
    }

    async fn complete(
        &self,
        system: &str,
        user: String,
        sampling: Sampling,
    ) -> Result<String, TranslateError> {
        let provider = self
            .provider
            .clone()
            .ok_or_else(|| TranslateError::MissingKey {
                env: self.settings.api_key_env.clone(),
            })?;
        let response = provider
            .append_system_input(system.to_string())
            .append_user_input(user)
            .with_sampling(sampling)
            .complete()
            .await?;
        Ok(response.content)
    }
}

/// NFC, LF line endings, no surrounding whitespace.
pub fn normalize_input(text: &str) -> String {
    text.nfc()
        .collect::<String>()
        .replace("\r\n", "\n")
        .trim()
        .to_string()
}

/// Drops wrapping quotes or brackets and folds line breaks into spaces.
pub fn clean_response(text: &str) -> String {
    let trimmed = text
        .trim()
        .trim_matches(|ch: char| QUOTE_CHARS.contains(&ch) || ch.is_whitespace());
    LINE_BREAKS.replace_all(trimmed, " ").into_owned()
}
