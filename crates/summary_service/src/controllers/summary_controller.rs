use std::collections::HashSet;

use actix_web::{web, HttpResponse};
use futures::future::try_join_all;
use summary_engine::comparator;

use crate::dto::{
    ComparisonRequest, ComparisonResponseDto, ComparisonResultDto, ModelCardDto,
    ModelsResponseDto, SummaryRequest, SummaryResponseDto, MIN_TEXT_LENGTH,
};
use crate::error::{AppError, Result};
use crate::server::AppState;

fn validate_text(text: &str) -> Result<()> {
    if text.trim().len() < MIN_TEXT_LENGTH {
        return Err(AppError::Validation(format!(
            "text must be at least {} characters long",
            MIN_TEXT_LENGTH
        )));
    }
    Ok(())
}

async fn generate_summary(
    state: web::Data<AppState>,
    request: web::Json<SummaryRequest>,
) -> Result<HttpResponse> {
    let request = request.into_inner();
    validate_text(&request.text)?;

    let outcome = state
        .summary_client
        .generate_summary(
            &request.model,
            &request.text,
            request.max_length,
            &request.language,
        )
        .await?;

    Ok(HttpResponse::Ok().json(SummaryResponseDto::from(&outcome)))
}

async fn compare_models(
    state: web::Data<AppState>,
    request: web::Json<ComparisonRequest>,
) -> Result<HttpResponse> {
    let request = request.into_inner();
    validate_text(&request.text)?;
    if request.models.len() < 2 {
        return Err(AppError::Validation(
            "comparison requires at least two models".to_string(),
        ));
    }
    let distinct: HashSet<&String> = request.models.iter().collect();
    if distinct.len() != request.models.len() {
        return Err(AppError::Validation(
            "comparison models must be distinct".to_string(),
        ));
    }

    // All models run concurrently; one failed invocation fails the whole
    // event so partial results never reach the aggregate store.
    let outcomes = try_join_all(request.models.iter().map(|model| {
        state.summary_client.generate_summary(
            model,
            &request.text,
            request.max_length,
            &request.language,
        )
    }))
    .await?;

    let records: Vec<_> = outcomes.iter().map(|o| o.record.clone()).collect();
    let verdict = comparator::compare(&records)?;
    state.storage.record_comparison(&records, &verdict).await?;

    Ok(HttpResponse::Ok().json(ComparisonResponseDto {
        results: outcomes.iter().map(SummaryResponseDto::from).collect(),
        comparison: ComparisonResultDto::from(&verdict),
    }))
}

async fn list_models(state: web::Data<AppState>) -> Result<HttpResponse> {
    let models: Vec<ModelCardDto> = state
        .summary_client
        .supported_models()
        .iter()
        .map(ModelCardDto::from)
        .collect();
    Ok(HttpResponse::Ok().json(ModelsResponseDto { models }))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/summary")
            .route("/generate", web::post().to(generate_summary))
            .route("/compare", web::post().to(compare_models))
            .route("/models", web::get().to(list_models)),
    );
}
