use anyhow::{Context, Result, anyhow};
use std::path::Path;
use std::sync::Arc;

pub mod annotate;
pub mod detect;
pub mod dictionary;
pub mod error;
pub mod logging;
pub mod phrase;
pub mod providers;
pub mod server;
pub mod settings;
pub mod translator;

pub use annotate::{CharAnnotation, PhraseAnnotation};
pub use detect::TranslationGuard;
pub use dictionary::PronunciationDictionary;
pub use error::TranslateError;
pub use phrase::{PhraseOutput, PhraseProcessor, SourceLanguage};
pub use providers::{OpenAI, Provider, ProviderUsage};
pub use translator::{Direction, ExampleSentence, Translator};

#[derive(Debug, Clone)]
pub struct Config {
    pub source_lang: String,
    pub offline: bool,
    pub settings_path: Option<String>,
}

/// Processes one phrase read from stdin and renders the result for the
/// terminal.
pub async fn run(config: Config, input: Option<String>) -> Result<String> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let settings = settings::load_settings(settings_path)?;

    let input = input.unwrap_or_default();
    let input = input.trim();
    if input.is_empty() {
        return Err(anyhow!("stdin is empty"));
    }
    let source = SourceLanguage::parse(&config.source_lang)
        .ok_or_else(|| anyhow!("unsupported source language '{}'", config.source_lang))?;

    let dictionary = Arc::new(
        PronunciationDictionary::load(&settings.dictionary)
            .with_context(|| "failed to load pronunciation dictionary")?,
    );
    if config.offline {
        let annotation = annotate::annotate(&dictionary, &translator::normalize_input(input));
        return Ok(format_annotation(&annotation));
    }

    let processor = PhraseProcessor::new(
        dictionary,
        Translator::from_settings(&settings.translation),
        TranslationGuard::new(&settings.guard),
    );
    let output = processor
        .process(input, source)
        .await
        .with_context(|| "failed to process phrase")?;
    Ok(serde_json::to_string_pretty(&output)?)
}

fn format_annotation(annotation: &PhraseAnnotation) -> String {
    let mut lines = annotation
        .chars
        .iter()
        .map(|entry| {
            format!(
                "{}\t{}\t{}",
                entry.ch,
                entry.romanizations.join("/"),
                entry.transliterations.join("/")
            )
        })
        .collect::<Vec<_>>();
    lines.push(format!("jyutping: {}", annotation.jyutping()));
    lines.push(format!("katakana: {}", annotation.katakana()));
    lines.push(format!("jyutping (others): {}", annotation.jyutping_multi()));
    lines.push(format!("katakana (others): {}", annotation.katakana_multi()));
    lines.join("\n")
}
