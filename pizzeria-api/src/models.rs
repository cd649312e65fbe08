use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateRestaurantPizzaRequest {
    /// Price in whole currency units, between 1 and 30
    pub price: i64,
    /// Identifier of an existing pizza
    pub pizza_id: i32,
    /// Identifier of an existing restaurant
    pub restaurant_id: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorResponse {
    /// Error message
    pub error: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ValidationErrorResponse {
    /// Every problem found with the request
    pub errors: Vec<String>,
}
