use actix_web::{web, HttpResponse};
use summary_engine::{analysis, RecommendCriteria};

use crate::dto::{RecommendQuery, RecommendationDto};
use crate::error::{AppError, Result};
use crate::server::AppState;

async fn list_analysis(state: web::Data<AppState>) -> Result<HttpResponse> {
    let rows = analysis::list_analysis(state.storage.as_ref()).await?;
    Ok(HttpResponse::Ok().json(rows))
}

async fn recommend_model(
    state: web::Data<AppState>,
    query: web::Query<RecommendQuery>,
) -> Result<HttpResponse> {
    let criteria = match query.criteria.as_deref() {
        None => RecommendCriteria::Balanced,
        Some(raw) => RecommendCriteria::parse(raw).ok_or_else(|| {
            AppError::Validation(format!(
                "unknown criteria '{}', expected balanced, speed or cost",
                raw
            ))
        })?,
    };

    let rows = analysis::list_analysis(state.storage.as_ref()).await?;
    let recommendation = analysis::recommend(&rows, criteria).ok_or(AppError::NoData)?;

    Ok(HttpResponse::Ok().json(RecommendationDto::from(recommendation)))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/analysis")
            .route("", web::get().to(list_analysis))
            .route("/recommend", web::get().to(recommend_model)),
    );
}
