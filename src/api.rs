// API routes and handlers
use crate::error::ServiceError;
use crate::language::Language;
use crate::state::AppState;
use actix_web::http::StatusCode;
use actix_web::{get, post, web, HttpResponse, Responder, ResponseError};
use log::error;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
pub struct LanguageInfo {
    pub code: Language,
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct TranslateRequest {
    pub text: String,
    pub source_lang: String,
    pub target_lang: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct TranslateResponse {
    pub translated_text: String,
    pub source_lang: Language,
    pub target_lang: Language,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SummarizeRequest {
    pub text: String,
    pub max_length: Option<usize>,
    pub min_length: Option<usize>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SummarizeResponse {
    pub summary: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct LoadedModelsResponse {
    pub loaded: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::InvalidRequest(_) | ServiceError::UnsupportedLanguage(_) => {
                StatusCode::BAD_REQUEST
            }
            ServiceError::ModelUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Inference { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            error!("{}", self);
        }
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
        })
    }
}

fn require_text(text: &str) -> Result<(), ServiceError> {
    if text.trim().is_empty() {
        return Err(ServiceError::InvalidRequest("text is empty".to_string()));
    }
    Ok(())
}

#[get("/health")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

#[get("/languages")]
pub async fn languages() -> impl Responder {
    let languages: Vec<LanguageInfo> = Language::ALL
        .into_iter()
        .map(|code| LanguageInfo {
            code,
            name: code.display_name().to_string(),
        })
        .collect();
    HttpResponse::Ok().json(languages)
}

#[post("/translate")]
pub async fn translate(
    state: web::Data<AppState>,
    payload: web::Json<TranslateRequest>,
) -> actix_web::Result<HttpResponse> {
    let TranslateRequest {
        text,
        source_lang,
        target_lang,
    } = payload.into_inner();
    require_text(&text)?;
    let source_lang: Language = source_lang.parse()?;
    let target_lang: Language = target_lang.parse()?;

    // inference blocks, keep it off the async workers
    let service = state.translation.clone();
    let translated_text =
        web::block(move || service.translate(&text, source_lang, target_lang)).await??;

    Ok(HttpResponse::Ok().json(TranslateResponse {
        translated_text,
        source_lang,
        target_lang,
    }))
}

#[post("/summarize")]
pub async fn summarize(
    state: web::Data<AppState>,
    payload: web::Json<SummarizeRequest>,
) -> actix_web::Result<HttpResponse> {
    let SummarizeRequest {
        text,
        max_length,
        min_length,
    } = payload.into_inner();
    require_text(&text)?;

    let service = state.summarization.clone();
    let defaults = service.defaults();
    let max_length = max_length.unwrap_or(defaults.max_length);
    // a caller asking for a short summary should not trip over the default minimum
    let min_length = min_length.unwrap_or(defaults.min_length.min(max_length));

    let summary = web::block(move || service.summarize(&text, max_length, min_length)).await??;
    Ok(HttpResponse::Ok().json(SummarizeResponse { summary }))
}

#[get("/models")]
pub async fn loaded_models(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(LoadedModelsResponse {
        loaded: state.cache.keys(),
    })
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .service(languages)
        .service(translate)
        .service(summarize)
        .service(loaded_models);
}
