pub mod error;
pub mod gpx_export;
pub mod models;
pub mod routing;
pub mod store;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};

use crate::error::RouteError;
use crate::gpx_export::encode_route_as_gpx;
use crate::models::{
    AlternativeRoute, ApiError, CityResponse, Coordinate, CrimeIncident, HeatPoint, RouteRequest,
    RouteResponse, SafetyRating, SearchResponse,
};
use crate::routing::{approximate_distance_km, synthesize_route};
use crate::store::CrimeStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<CrimeStore>,
}

pub fn create_router(state: AppState) -> Router {
    // Permissive CORS so the SPA can call the API from its own origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/crimes/nearby", post(nearby_handler))
        .route("/api/crimes/heatmap", post(heatmap_handler))
        .route("/api/crimes/search", get(search_handler))
        .route("/api/cities/:name", get(city_handler))
        .route("/api/route", post(route_handler))
        .layer(cors)
        .with_state(state)
}

async fn nearby_handler(
    State(state): State<AppState>,
    Json(location): Json<Coordinate>,
) -> Json<Vec<CrimeIncident>> {
    let incidents = state.store.incidents_near(location);
    tracing::debug!(
        lat = location.lat,
        lon = location.lon,
        count = incidents.len(),
        "nearby incident lookup"
    );
    Json(incidents)
}

async fn heatmap_handler(
    State(state): State<AppState>,
    Json(location): Json<Coordinate>,
) -> Json<Vec<HeatPoint>> {
    Json(state.store.heat_points(location))
}

#[derive(serde::Deserialize)]
struct SearchParams {
    q: String,
}

async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Json<SearchResponse> {
    let outcome = state.store.search(&params.q);
    let advisory = outcome.fallback.then(|| {
        tracing::warn!(query = %params.q, "no crime data matched, serving sample fallback");
        format!(
            "No crime data found for \"{}\". Showing sample data instead.",
            params.q
        )
    });

    Json(SearchResponse {
        incidents: outcome.incidents,
        advisory,
    })
}

async fn city_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<CityResponse>, (StatusCode, Json<ApiError>)> {
    match state.store.city_coordinate(&name) {
        Some(city) => Ok(Json(CityResponse {
            name: city.name.clone(),
            lat: city.coord.lat,
            lon: city.coord.lon,
        })),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ApiError {
                message: format!("no coordinates known for \"{name}\""),
            }),
        )),
    }
}

async fn route_handler(
    Json(req): Json<RouteRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiError>)> {
    let synthesis = synthesize_route(req.start, req.end, &mut rand::thread_rng());
    let distance_km = approximate_distance_km(&synthesis.route);
    let gpx_base64 = encode_route_as_gpx(&synthesis.route).map_err(internal_error)?;

    let alternative_routes = synthesis
        .alternatives
        .into_iter()
        .map(|alt| AlternativeRoute {
            route: alt.route,
            rating: SafetyRating::from_score(alt.safety_score),
            safety_score: alt.safety_score,
        })
        .collect();

    let response = RouteResponse {
        rating: SafetyRating::from_score(synthesis.safety_score),
        route: synthesis.route,
        safety_score: synthesis.safety_score,
        distance_km,
        gpx_base64,
        alternative_routes,
    };

    Ok(Json(response))
}

fn internal_error(err: RouteError) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError {
            message: err.to_string(),
        }),
    )
}
