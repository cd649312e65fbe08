pub mod pizza;
pub mod restaurant;
pub mod restaurant_pizza;

pub use pizza::router as pizza_router;
pub use restaurant::router as restaurant_router;
pub use restaurant_pizza::router as restaurant_pizza_router;

use axum::{Router, response::Html, routing::get};
use pizzeria_restaurant_service::{DbPool, RepositoryError, RestaurantRepository};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .merge(restaurant_router())
        .merge(pizza_router())
        .merge(restaurant_pizza_router())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn index() -> Html<&'static str> {
    Html("<h1>Code challenge</h1>")
}

/// Checks out a pooled connection on the blocking thread pool and runs `f`
/// against a repository bound to it.
async fn with_repository<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&mut RestaurantRepository<'_>) -> Result<T, RepositoryError> + Send + 'static,
{
    let pool = state.pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = pool
            .get()
            .map_err(|e| ApiError::ServiceUnavailable(format!("Database unavailable: {e}")))?;
        let mut repository = RestaurantRepository::new(&mut conn);
        f(&mut repository).map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::InternalError(format!("Repository task failed: {e}")))?
}

#[derive(OpenApi)]
#[openapi(
    paths(
        restaurant::list_restaurants,
        restaurant::get_restaurant,
        restaurant::delete_restaurant,
        pizza::list_pizzas,
        restaurant_pizza::create_restaurant_pizza,
    ),
    components(
        schemas(
            pizzeria_restaurant_service::models::RestaurantDetails,
            pizzeria_restaurant_service::models::RestaurantPizzaDetails,
            pizzeria_restaurant_service::models::Pizza,
            crate::models::CreateRestaurantPizzaRequest,
            crate::models::ApiErrorResponse,
            crate::models::ValidationErrorResponse
        )
    ),
    tags(
        (name = "restaurants", description = "Restaurant endpoints"),
        (name = "pizzas", description = "Pizza catalogue endpoints"),
        (name = "restaurant_pizzas", description = "Pizza price listing endpoints")
    ),
    info(
        title = "Pizzeria API",
        description = "Restaurants, pizzas and the prices restaurants charge for them",
        version = "1.0.0"
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode, header},
    };
    use http_body_util::BodyExt;
    use pizzeria_restaurant_service::{
        build_pool,
        models::{NewPizza, NewRestaurant},
        run_migrations,
    };
    use serde_json::{Value, json};
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        state: AppState,
        _dir: TempDir,
    }

    impl TestApp {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let database_url = dir.path().join("test.db").to_string_lossy().into_owned();
            let pool = build_pool(&database_url, 2).unwrap();
            run_migrations(&mut pool.get().unwrap()).unwrap();

            let state = AppState { pool };
            Self {
                router: app(state.clone()),
                state,
                _dir: dir,
            }
        }

        /// Restaurant{1,"A","X"} and Pizza{1,"Cheese","Dough,Cheese"}.
        fn with_fixtures(self) -> Self {
            let mut conn = self.state.pool.get().unwrap();
            let mut repo = RestaurantRepository::new(&mut conn);
            repo.create_restaurant(NewRestaurant::new("A", "X").unwrap())
                .unwrap();
            repo.create_pizza(NewPizza::new("Cheese", "Dough,Cheese").unwrap())
                .unwrap();
            drop(conn);
            self
        }

        fn count_restaurant_pizzas(&self) -> usize {
            let mut conn = self.state.pool.get().unwrap();
            let mut repo = RestaurantRepository::new(&mut conn);
            repo.list_restaurants()
                .unwrap()
                .iter()
                .map(|r| r.restaurant_pizzas.len())
                .sum()
        }

        async fn send(
            &self,
            method: Method,
            uri: &str,
            body: Option<Value>,
        ) -> (StatusCode, Vec<u8>) {
            let request = Request::builder().method(method).uri(uri);
            let request = match body {
                Some(body) => request
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string())),
                None => request.body(Body::empty()),
            }
            .unwrap();

            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let body = response.into_body().collect().await.unwrap().to_bytes();
            (status, body.to_vec())
        }

        async fn json(
            &self,
            method: Method,
            uri: &str,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let (status, body) = self.send(method, uri, body).await;
            (status, serde_json::from_slice(&body).unwrap())
        }
    }

    #[tokio::test]
    async fn test_index() {
        let app = TestApp::new();
        let (status, body) = app.send(Method::GET, "/", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"<h1>Code challenge</h1>");
    }

    #[tokio::test]
    async fn test_create_restaurant_pizza_scenario() {
        let app = TestApp::new().with_fixtures();

        let (status, body) = app
            .json(
                Method::POST,
                "/restaurant_pizzas",
                Some(json!({"price": 15, "pizza_id": 1, "restaurant_id": 1})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(
            body,
            json!({
                "id": 1,
                "price": 15,
                "pizza_id": 1,
                "restaurant_id": 1,
                "pizza": {"id": 1, "name": "Cheese", "ingredients": "Dough,Cheese"},
            })
        );

        let (status, body) = app
            .json(
                Method::POST,
                "/restaurant_pizzas",
                Some(json!({"price": 35, "pizza_id": 1, "restaurant_id": 1})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"errors": ["Price must be between 1 and 30"]}));
        assert_eq!(app.count_restaurant_pizzas(), 1);
    }

    #[tokio::test]
    async fn test_create_restaurant_pizza_price_beyond_integer_range() {
        let app = TestApp::new().with_fixtures();

        for price in [json!(99_999_999_999_i64), json!(-99_999_999_999_i64)] {
            let (status, body) = app
                .json(
                    Method::POST,
                    "/restaurant_pizzas",
                    Some(json!({"price": price, "pizza_id": 1, "restaurant_id": 1})),
                )
                .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body, json!({"errors": ["Price must be between 1 and 30"]}));
        }
        assert_eq!(app.count_restaurant_pizzas(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_creates_all_succeed() {
        let app = TestApp::new().with_fixtures();

        let requests = (0..40).map(|i| {
            let router = app.router.clone();
            tokio::spawn(async move {
                let payload = json!({"price": i % 30 + 1, "pizza_id": 1, "restaurant_id": 1});
                let request = Request::builder()
                    .method(Method::POST)
                    .uri("/restaurant_pizzas")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(payload.to_string()))
                    .unwrap();
                router.oneshot(request).await.unwrap().status()
            })
        });

        for request in requests.collect::<Vec<_>>() {
            assert_eq!(request.await.unwrap(), StatusCode::CREATED);
        }
        assert_eq!(app.count_restaurant_pizzas(), 40);
    }

    #[tokio::test]
    async fn test_create_restaurant_pizza_unknown_references() {
        let app = TestApp::new().with_fixtures();

        for payload in [
            json!({"price": 10, "pizza_id": 9, "restaurant_id": 1}),
            json!({"price": 10, "pizza_id": 1, "restaurant_id": 9}),
        ] {
            let (status, body) = app
                .json(Method::POST, "/restaurant_pizzas", Some(payload))
                .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["errors"].as_array().unwrap().len(), 1);
        }
        assert_eq!(app.count_restaurant_pizzas(), 0);
    }

    #[tokio::test]
    async fn test_create_restaurant_pizza_malformed_body() {
        let app = TestApp::new().with_fixtures();

        let (status, body) = app
            .json(
                Method::POST,
                "/restaurant_pizzas",
                Some(json!({"price": "cheap", "pizza_id": 1})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["errors"][0].is_string());
        assert_eq!(app.count_restaurant_pizzas(), 0);
    }

    #[tokio::test]
    async fn test_round_trip_shows_new_price_once() {
        let app = TestApp::new().with_fixtures();

        let (status, _) = app
            .json(
                Method::POST,
                "/restaurant_pizzas",
                Some(json!({"price": 7, "pizza_id": 1, "restaurant_id": 1})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = app.json(Method::GET, "/restaurants/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], 1);
        assert_eq!(body["name"], "A");
        assert_eq!(body["address"], "X");

        let restaurant_pizzas = body["restaurant_pizzas"].as_array().unwrap();
        let matching = restaurant_pizzas
            .iter()
            .filter(|rp| rp["price"] == 7 && rp["pizza_id"] == 1)
            .count();
        assert_eq!(restaurant_pizzas.len(), 1);
        assert_eq!(matching, 1);
        assert!(restaurant_pizzas[0].get("restaurant").is_none());
    }

    #[tokio::test]
    async fn test_get_restaurant_not_found() {
        let app = TestApp::new().with_fixtures();

        let (status, _) = app.send(Method::GET, "/restaurants/42", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app.send(Method::GET, "/restaurants/abc", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_restaurants() {
        let app = TestApp::new().with_fixtures();
        app.json(
            Method::POST,
            "/restaurant_pizzas",
            Some(json!({"price": 11, "pizza_id": 1, "restaurant_id": 1})),
        )
        .await;

        let (status, body) = app.json(Method::GET, "/restaurants", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([{
                "id": 1,
                "name": "A",
                "address": "X",
                "restaurant_pizzas": [{
                    "id": 1,
                    "price": 11,
                    "pizza_id": 1,
                    "restaurant_id": 1,
                    "pizza": {"id": 1, "name": "Cheese", "ingredients": "Dough,Cheese"},
                }],
            }])
        );
    }

    #[tokio::test]
    async fn test_delete_restaurant() {
        let app = TestApp::new().with_fixtures();
        app.json(
            Method::POST,
            "/restaurant_pizzas",
            Some(json!({"price": 11, "pizza_id": 1, "restaurant_id": 1})),
        )
        .await;

        let (status, body) = app.send(Method::DELETE, "/restaurants/1", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(body.is_empty());
        assert_eq!(app.count_restaurant_pizzas(), 0);

        let (status, _) = app.send(Method::GET, "/restaurants/1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app.send(Method::DELETE, "/restaurants/1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, pizzas) = app.json(Method::GET, "/pizzas", None).await;
        assert_eq!(pizzas.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_pizzas() {
        let app = TestApp::new().with_fixtures();

        let (status, body) = app.json(Method::GET, "/pizzas", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([{"id": 1, "name": "Cheese", "ingredients": "Dough,Cheese"}])
        );
    }

    #[tokio::test]
    async fn test_openapi_document() {
        let app = TestApp::new();

        let (status, body) = app.json(Method::GET, "/api-docs/openapi.json", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/restaurant_pizzas"]["post"].is_object());
        assert!(body["paths"]["/restaurants/{id}"]["delete"].is_object());
    }
}
