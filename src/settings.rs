use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

pub const DEFAULT_PARTICLES: &str = "呀啦喺咁嘅冇哋唔嗰嚟噉咗嘢佢咩囉喎";

#[derive(Debug, Clone)]
pub struct Settings {
    pub dictionary: DictionarySettings,
    pub translation: TranslationSettings,
    pub guard: GuardSettings,
    pub server_addr: String,
}

#[derive(Debug, Clone)]
pub struct DictionarySettings {
    pub jyutping_path: Option<PathBuf>,
    pub katakana_path: Option<PathBuf>,
    pub character_column: String,
    pub romanization_column: String,
}

#[derive(Debug, Clone)]
pub struct TranslationSettings {
    pub api_key_env: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    pub example_max_tokens: u32,
    pub example_temperature: f64,
}

/// Policy constants for the translation guard.
#[derive(Debug, Clone)]
pub struct GuardSettings {
    pub similarity_threshold: f64,
    pub min_length: usize,
    pub particles: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dictionary: DictionarySettings::default(),
            translation: TranslationSettings::default(),
            guard: GuardSettings::default(),
            server_addr: "127.0.0.1:3000".to_string(),
        }
    }
}

impl Default for DictionarySettings {
    fn default() -> Self {
        Self {
            jyutping_path: None,
            katakana_path: None,
            character_column: "char".to_string(),
            romanization_column: "jyutping".to_string(),
        }
    }
}

impl Default for TranslationSettings {
    fn default() -> Self {
        Self {
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 2000,
            temperature: 0.3,
            top_p: 0.8,
            example_max_tokens: 200,
            example_temperature: 0.7,
        }
    }
}

impl Default for GuardSettings {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.95,
            min_length: 20,
            particles: DEFAULT_PARTICLES.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    dictionary: Option<DictionaryFile>,
    translation: Option<TranslationFile>,
    guard: Option<GuardFile>,
    server: Option<ServerFile>,
}

#[derive(Debug, Default, Deserialize)]
struct DictionaryFile {
    jyutping: Option<String>,
    katakana: Option<String>,
    character_column: Option<String>,
    romanization_column: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TranslationFile {
    api_key_env: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f64>,
    top_p: Option<f64>,
    example_max_tokens: Option<u32>,
    example_temperature: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct GuardFile {
    similarity_threshold: Option<f64>,
    min_length: Option<usize>,
    particles: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerFile {
    addr: Option<String>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    ensure_home_settings_file()?;

    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    load_settings_from(&ordered_paths)
}

/// Merges every existing file in `paths` over the defaults, in order.
pub fn load_settings_from(paths: &[PathBuf]) -> Result<Settings> {
    let mut settings = Settings::default();
    for path in paths {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed, path.parent());
        }
    }
    Ok(settings)
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile, base_dir: Option<&Path>) {
        if let Some(dictionary) = incoming.dictionary {
            if let Some(path) = non_blank(dictionary.jyutping) {
                self.dictionary.jyutping_path = Some(resolve_path(&path, base_dir));
            }
            if let Some(path) = non_blank(dictionary.katakana) {
                self.dictionary.katakana_path = Some(resolve_path(&path, base_dir));
            }
            if let Some(column) = non_blank(dictionary.character_column) {
                self.dictionary.character_column = column;
            }
            if let Some(column) = non_blank(dictionary.romanization_column) {
                self.dictionary.romanization_column = column;
            }
        }
        if let Some(translation) = incoming.translation {
            if let Some(env) = non_blank(translation.api_key_env) {
                self.translation.api_key_env = env;
            }
            if let Some(url) = non_blank(translation.base_url) {
                self.translation.base_url = url.trim_end_matches('/').to_string();
            }
            if let Some(model) = non_blank(translation.model) {
                self.translation.model = model;
            }
            if let Some(value) = translation.max_tokens.filter(|value| *value > 0) {
                self.translation.max_tokens = value;
            }
            if let Some(value) = translation.temperature.filter(|value| *value >= 0.0) {
                self.translation.temperature = value;
            }
            if let Some(value) = translation.top_p.filter(|value| *value > 0.0) {
                self.translation.top_p = value;
            }
            if let Some(value) = translation.example_max_tokens.filter(|value| *value > 0) {
                self.translation.example_max_tokens = value;
            }
            if let Some(value) = translation.example_temperature.filter(|value| *value >= 0.0) {
                self.translation.example_temperature = value;
            }
        }
        if let Some(guard) = incoming.guard {
            if let Some(value) = guard.similarity_threshold.filter(|value| *value > 0.0) {
                self.guard.similarity_threshold = value;
            }
            if let Some(value) = guard.min_length.filter(|value| *value > 0) {
                self.guard.min_length = value;
            }
            if let Some(particles) = non_blank(guard.particles) {
                self.guard.particles = particles;
            }
        }
        if let Some(server) = incoming.server {
            if let Some(addr) = non_blank(server.addr) {
                self.server_addr = addr;
            }
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

// Relative dictionary paths are taken from the directory of the settings file
// that named them, except for the working-directory files.
fn resolve_path(raw: &str, base_dir: Option<&Path>) -> PathBuf {
    let path = PathBuf::from(raw);
    match base_dir {
        Some(base) if path.is_relative() && !base.as_os_str().is_empty() => base.join(path),
        _ => path,
    }
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = home_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".canto-phrase"))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults_match_code_defaults() {
        let parsed: SettingsFile = toml::from_str(DEFAULT_SETTINGS_TOML).expect("parse defaults");
        let mut settings = Settings::default();
        settings.merge(parsed, None);
        let defaults = Settings::default();
        assert_eq!(settings.guard.particles, defaults.guard.particles);
        assert_eq!(settings.guard.min_length, defaults.guard.min_length);
        assert_eq!(settings.translation.max_tokens, defaults.translation.max_tokens);
        assert_eq!(settings.translation.model, defaults.translation.model);
        assert!(settings.dictionary.jyutping_path.is_none());
        assert!(settings.dictionary.katakana_path.is_none());
    }

    #[test]
    fn later_files_override_earlier_ones() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = dir.path().join("first.toml");
        let second = dir.path().join("second.toml");
        fs::write(
            &first,
            "[guard]\nmin_length = 10\nsimilarity_threshold = 0.9\n[server]\naddr = \"0.0.0.0:8080\"\n",
        )
        .expect("write first");
        fs::write(
            &second,
            "[guard]\nmin_length = 0\nparticles = \"嘅\"\n[dictionary]\njyutping = \"dict/canto.tsv\"\n",
        )
        .expect("write second");

        let settings = load_settings_from(&[first, second]).expect("settings");
        assert_eq!(settings.guard.min_length, 10);
        assert_eq!(settings.guard.similarity_threshold, 0.9);
        assert_eq!(settings.guard.particles, "嘅");
        assert_eq!(settings.server_addr, "0.0.0.0:8080");
        assert_eq!(
            settings.dictionary.jyutping_path,
            Some(dir.path().join("dict/canto.tsv"))
        );
    }

    #[test]
    fn malformed_settings_name_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[guard\n").expect("write");
        let err = load_settings_from(&[path]).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }
}
