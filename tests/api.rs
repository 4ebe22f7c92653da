mod common;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use common::StubProvider;
use serde_json::json;
use std::sync::Arc;
use translation_server::api::{
    self, ErrorResponse, LanguageInfo, LoadedModelsResponse, SummarizeResponse, TranslateResponse,
};
use translation_server::config::SummaryDefaults;
use translation_server::language::Language::*;
use translation_server::state::AppState;

fn state(provider: Arc<StubProvider>) -> AppState {
    AppState::new(provider, SummaryDefaults::default())
}

#[actix_web::test]
async fn test_languages() {
    let provider = Arc::new(StubProvider::new(&[]));
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state(provider)))
            .configure(api::configure),
    )
    .await;

    let req = test::TestRequest::get().uri("/languages").to_request();
    let languages: Vec<LanguageInfo> = test::call_and_read_body_json(&app, req).await;

    let codes: Vec<&str> = languages.iter().map(|l| l.code.code()).collect();
    assert_eq!(codes, vec!["en", "de", "fr", "es", "it", "ru", "zh"]);
    assert_eq!(languages[1].name, "German");
}

#[actix_web::test]
async fn test_translate_then_summarize() {
    let provider = Arc::new(StubProvider::new(&[(English, German)]));
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state(provider.clone())))
            .configure(api::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/translate")
        .set_json(json!({
            "text": "The quick brown fox jumps over the lazy dog.",
            "source_lang": "en",
            "target_lang": "de"
        }))
        .to_request();
    let translated: TranslateResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(
        translated.translated_text,
        "[en-de] The quick brown fox jumps over the lazy dog."
    );
    assert_eq!(translated.source_lang, English);
    assert_eq!(translated.target_lang, German);

    let req = test::TestRequest::post()
        .uri("/summarize")
        .set_json(json!({ "text": translated.translated_text }))
        .to_request();
    let summarized: SummarizeResponse = test::call_and_read_body_json(&app, req).await;
    assert!(!summarized.summary.is_empty());
    assert!(summarized.summary.len() <= translated.translated_text.len());

    let req = test::TestRequest::get().uri("/models").to_request();
    let models: LoadedModelsResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(
        models.loaded,
        vec![
            "summarization:stub/summarizer".to_string(),
            "translation:stub/opus-mt-en-de".to_string(),
        ]
    );
    assert_eq!(provider.loads(), 2);
}

#[actix_web::test]
async fn test_translate_pivots_through_english() {
    let provider = Arc::new(StubProvider::new(&[(French, English), (English, Russian)]));
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state(provider)))
            .configure(api::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/translate")
        .set_json(json!({ "text": "Bonjour", "source_lang": "fr", "target_lang": "ru" }))
        .to_request();
    let translated: TranslateResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(translated.translated_text, "[en-ru] [fr-en] Bonjour");
}

#[actix_web::test]
async fn test_translate_rejects_bad_input() {
    let provider = Arc::new(StubProvider::new(&[(English, German)]));
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state(provider.clone())))
            .configure(api::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/translate")
        .set_json(json!({ "text": "  ", "source_lang": "en", "target_lang": "de" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/translate")
        .set_json(json!({ "text": "Merhaba", "source_lang": "tr", "target_lang": "de" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: ErrorResponse = test::read_body_json(resp).await;
    assert_eq!(body.error, "Unsupported language: tr");

    assert_eq!(provider.loads(), 0);
}

#[actix_web::test]
async fn test_translate_unavailable_model() {
    let provider = Arc::new(StubProvider::new(&[]));
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state(provider)))
            .configure(api::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/translate")
        .set_json(json!({ "text": "Hello", "source_lang": "en", "target_lang": "zh" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: ErrorResponse = test::read_body_json(resp).await;
    assert!(body.error.contains("stub/opus-mt-en-zh"));
}

#[actix_web::test]
async fn test_summarize_length_bounds() {
    let provider = Arc::new(StubProvider::new(&[]));
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state(provider)))
            .configure(api::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/summarize")
        .set_json(json!({ "text": "one two three four five six", "max_length": 3 }))
        .to_request();
    let summarized: SummarizeResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(summarized.summary, "one two three");

    let req = test::TestRequest::post()
        .uri("/summarize")
        .set_json(json!({ "text": "one two three", "max_length": 5, "min_length": 10 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
