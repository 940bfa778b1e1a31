use actix_web::{get, post, web, HttpResponse, Responder};
use tracing::instrument;
use validator::Validate;

use crate::{
    entities::media::Portfolio, errors::AppError,
    repositories::portfolio::PortfolioRepository, AppState,
};

#[post("/save-portfolio")]
#[instrument(skip(state, portfolio))]
pub async fn save_portfolio(
    state: web::Data<AppState>,
    portfolio: web::Json<Portfolio>,
) -> Result<impl Responder, AppError> {
    let portfolio = portfolio.into_inner();
    portfolio.validate()?;

    state
        .portfolio_repo
        .save(&portfolio.user_id, portfolio.items)
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Portfolio saved successfully"
    })))
}

#[get("/load-portfolio/{user_id}")]
#[instrument(skip(state))]
pub async fn load_portfolio(
    user_id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let items = state.portfolio_repo.load(&user_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "items": items })))
}
