use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

pub(crate) const PHRASE_REQUIRED: &str = "Phrase is required";
pub(crate) const TEXT_REQUIRED: &str = "Text is required";
pub(crate) const INTERNAL_ERROR: &str = "Internal server error";
pub(crate) const TRANSLATION_FAILED: &str =
    "翻訳に失敗しました。しばらくしてから再度お試しください。";

#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct ProcessPhraseRequest {
    pub(crate) phrase: Option<String>,
    pub(crate) source_lang: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct TranslateRequest {
    pub(crate) text: Option<String>,
    pub(crate) direction: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TranslateResponse {
    pub(crate) translation: String,
}

/// Body returned when the Japanese input could not be translated.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TranslationFailureResponse {
    pub(crate) error: String,
    pub(crate) jyutping: String,
    pub(crate) katakana: String,
    pub(crate) jyutping_multi: String,
    pub(crate) katakana_multi: String,
    pub(crate) example_cantonese: String,
    pub(crate) example_japanese: String,
    pub(crate) example_full: String,
}

impl TranslationFailureResponse {
    pub(crate) fn new() -> Self {
        Self {
            error: TRANSLATION_FAILED.to_string(),
            jyutping: String::new(),
            katakana: String::new(),
            jyutping_multi: String::new(),
            katakana_multi: String::new(),
            example_cantonese: String::new(),
            example_japanese: String::new(),
            example_full: String::new(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}

#[derive(Debug)]
pub(crate) struct ServerError {
    pub(crate) status: StatusCode,
    pub(crate) message: String,
}

impl ServerError {
    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub(crate) fn translation_failed() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: TRANSLATION_FAILED.to_string(),
        }
    }

    pub(crate) fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: INTERNAL_ERROR.to_string(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}
