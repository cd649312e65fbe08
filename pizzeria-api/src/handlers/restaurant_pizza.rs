use axum::{
    Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
    routing::post,
};
use pizzeria_restaurant_service::models::RestaurantPizzaDetails;
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::models::*;

use super::{AppState, with_repository};

pub fn router() -> Router<AppState> {
    Router::new().route("/restaurant_pizzas", post(create_restaurant_pizza))
}

#[utoipa::path(
    post,
    path = "/restaurant_pizzas",
    request_body = CreateRestaurantPizzaRequest,
    responses(
        (status = 201, description = "Pizza price listed", body = RestaurantPizzaDetails),
        (status = 400, description = "Invalid price, unknown pizza or restaurant, or malformed body", body = ValidationErrorResponse),
    ),
    tag = "restaurant_pizzas"
)]
#[instrument(skip(state))]
pub async fn create_restaurant_pizza(
    State(state): State<AppState>,
    payload: Result<Json<CreateRestaurantPizzaRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RestaurantPizzaDetails>), ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::Validation(vec![e.body_text()]))?;

    let created = with_repository(&state, move |repo| {
        repo.create_restaurant_pizza(payload.price, payload.pizza_id, payload.restaurant_id)
    })
    .await?;
    info!(id = created.id, "restaurant pizza created");

    Ok((StatusCode::CREATED, Json(created)))
}
