use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, HeaderValue, Method, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::models::{
    PHRASE_REQUIRED, ProcessPhraseRequest, ServerError, TEXT_REQUIRED, TranslateRequest,
    TranslateResponse, TranslationFailureResponse,
};
use super::state::ServerState;
use crate::detect::TranslationGuard;
use crate::dictionary::PronunciationDictionary;
use crate::phrase::{PhraseProcessor, SourceLanguage};
use crate::providers::Provider;
use crate::settings::Settings;
use crate::translator::{Direction, Translator};

pub async fn run_server(settings: Settings, addr: String) -> Result<()> {
    let dictionary = PronunciationDictionary::load(&settings.dictionary)
        .with_context(|| "failed to load pronunciation dictionary")?;
    let translator = Translator::from_settings(&settings.translation);
    let processor = PhraseProcessor::new(
        Arc::new(dictionary),
        translator,
        TranslationGuard::new(&settings.guard),
    );
    let app = router(Arc::new(ServerState { processor }));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| "failed to bind server address")?;
    info!("listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn router<P: Provider>(state: Arc<ServerState<P>>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/process-phrase", post(process_phrase::<P>))
        .route("/api/translate", post(translate::<P>))
        .with_state(state)
        .layer(axum::middleware::from_fn(cors_middleware))
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn cors_middleware(req: Request<Body>, next: Next) -> Result<Response<Body>, StatusCode> {
    if req.method() == Method::OPTIONS {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        apply_cors_headers(response.headers_mut());
        return Ok(response);
    }
    let mut response = next.run(req).await;
    apply_cors_headers(response.headers_mut());
    Ok(response)
}

fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("GET,POST,OPTIONS"),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static("content-type,authorization"),
    );
}

async fn process_phrase<P: Provider>(
    State(state): State<Arc<ServerState<P>>>,
    payload: Result<Json<ProcessPhraseRequest>, JsonRejection>,
) -> Result<Response, ServerError> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!("rejected process-phrase body: {}", rejection);
            return Err(ServerError::bad_request(PHRASE_REQUIRED));
        }
    };
    let Some(phrase) = request.phrase.filter(|phrase| !phrase.is_empty()) else {
        return Err(ServerError::bad_request(PHRASE_REQUIRED));
    };
    let source = request.source_lang.as_deref().unwrap_or("auto");
    let Some(source) = SourceLanguage::parse(source) else {
        return Err(ServerError::bad_request(format!(
            "Unsupported sourceLang: {}",
            source
        )));
    };

    let task = tokio::spawn(async move { state.processor.process(&phrase, source).await });
    match task.await {
        Ok(Ok(output)) => Ok((StatusCode::OK, Json(output)).into_response()),
        Ok(Err(err)) => {
            error!("phrase translation failed: {}", err);
            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(TranslationFailureResponse::new()),
            )
                .into_response())
        }
        Err(err) => {
            error!("phrase processing task failed: {}", err);
            Err(ServerError::internal())
        }
    }
}

async fn translate<P: Provider>(
    State(state): State<Arc<ServerState<P>>>,
    payload: Result<Json<TranslateRequest>, JsonRejection>,
) -> Result<Json<TranslateResponse>, ServerError> {
    let request = payload
        .map(|Json(request)| request)
        .map_err(|rejection| {
            warn!("rejected translate body: {}", rejection);
            ServerError::bad_request(TEXT_REQUIRED)
        })?;
    let Some(text) = request.text.filter(|text| !text.trim().is_empty()) else {
        return Err(ServerError::bad_request(TEXT_REQUIRED));
    };
    let direction = request.direction.as_deref().unwrap_or("ja-yue");
    let Some(direction) = Direction::parse(direction) else {
        return Err(ServerError::bad_request(format!(
            "Unsupported direction: {}",
            direction
        )));
    };

    let task = tokio::spawn(async move {
        state
            .processor
            .translator()
            .translate(&text, direction)
            .await
    });
    match task.await {
        Ok(Ok(translation)) => Ok(Json(TranslateResponse { translation })),
        Ok(Err(err)) => {
            error!("translation failed: {}", err);
            Err(ServerError::translation_failed())
        }
        Err(err) => {
            error!("translation task failed: {}", err);
            Err(ServerError::internal())
        }
    }
}
