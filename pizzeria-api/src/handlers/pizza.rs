use axum::{Router, extract::State, response::Json, routing::get};
use pizzeria_restaurant_service::models::Pizza;
use tracing::instrument;

use crate::error::ApiError;

use super::{AppState, with_repository};

pub fn router() -> Router<AppState> {
    Router::new().route("/pizzas", get(list_pizzas))
}

#[utoipa::path(
    get,
    path = "/pizzas",
    responses(
        (status = 200, description = "All pizzas", body = [Pizza]),
    ),
    tag = "pizzas"
)]
#[instrument(skip(state))]
pub async fn list_pizzas(State(state): State<AppState>) -> Result<Json<Vec<Pizza>>, ApiError> {
    let pizzas = with_repository(&state, |repo| repo.list_pizzas()).await?;
    Ok(Json(pizzas))
}
