// Snackonomics - Web Server
// JSON API over the observation store and the pricing engine

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;

use snackonomics::{
    classify, final_price, latest_observation, monthly_volume, observations_since,
    projected_profit, setup_database, unit_cost, Observation, PricingError, TrendReport,
    TrendSummary,
};

/// Shared application state
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn err(message: String) -> Self {
        Self {
            success: false,
            data: (),
            error: Some(message),
        }
    }
}

/// Observation response (stable field set for API consumers)
#[derive(Serialize)]
struct ObservationResponse {
    id: String,
    recorded_at: String,
    price_start: f64,
    price_end: f64,
    quantity_start: f64,
    quantity_end: f64,
    elasticity: Option<f64>,
}

impl From<Observation> for ObservationResponse {
    fn from(obs: Observation) -> Self {
        Self {
            id: obs.id,
            recorded_at: obs.recorded_at.to_rfc3339(),
            price_start: obs.price_start,
            price_end: obs.price_end,
            quantity_start: obs.quantity_start,
            quantity_end: obs.quantity_end,
            elasticity: obs.elasticity,
        }
    }
}

#[derive(Deserialize)]
struct PeriodQuery {
    /// Look-back window in days; absent = everything
    days: Option<u32>,
}

/// Latest elasticity reading plus its business classification
#[derive(Serialize)]
struct ElasticityResponse {
    elasticity: Option<f64>,
    category: &'static str,
    message: &'static str,
}

#[derive(Deserialize)]
struct QuoteRequest {
    ingredient_cost: f64,
    monthly_labor: f64,
    daily_production: f64,
    margin_percent: f64,
}

#[derive(Serialize)]
struct QuoteResponse {
    unit_cost: f64,
    suggested_price: f64,
    monthly_volume: f64,
    projected_monthly_profit: f64,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/observations?days=N - Stored observations, oldest first
async fn get_observations(
    State(state): State<AppState>,
    Query(period): Query<PeriodQuery>,
) -> impl IntoResponse {
    let conn = state.db.lock().unwrap();

    match observations_since(&conn, period.days) {
        Ok(observations) => {
            let response: Vec<ObservationResponse> =
                observations.into_iter().map(|obs| obs.into()).collect();

            (StatusCode::OK, Json(ApiResponse::ok(response))).into_response()
        }
        Err(e) => {
            eprintln!("Error getting observations: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::err(e.to_string())),
            )
                .into_response()
        }
    }
}

/// GET /api/elasticity/latest - Latest record's elasticity and advice
async fn get_latest_elasticity(State(state): State<AppState>) -> impl IntoResponse {
    let conn = state.db.lock().unwrap();

    match latest_observation(&conn) {
        Ok(latest) => {
            let elasticity = latest.and_then(|obs| obs.elasticity);
            let verdict = classify(elasticity);

            let response = ElasticityResponse {
                elasticity,
                category: verdict.category.as_str(),
                message: verdict.message,
            };

            (StatusCode::OK, Json(ApiResponse::ok(response))).into_response()
        }
        Err(e) => {
            eprintln!("Error getting latest elasticity: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::err(e.to_string())),
            )
                .into_response()
        }
    }
}

/// GET /api/stats?days=N - Trend summary for the period
async fn get_stats(
    State(state): State<AppState>,
    Query(period): Query<PeriodQuery>,
) -> impl IntoResponse {
    let conn = state.db.lock().unwrap();

    match observations_since(&conn, period.days) {
        Ok(observations) => {
            let summary: TrendSummary = TrendReport::new(observations).summary();

            (StatusCode::OK, Json(ApiResponse::ok(summary))).into_response()
        }
        Err(e) => {
            eprintln!("Error getting stats: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::err(e.to_string())),
            )
                .into_response()
        }
    }
}

/// POST /api/quote - Cost breakdown and suggested price from raw inputs
async fn post_quote(Json(req): Json<QuoteRequest>) -> impl IntoResponse {
    let quote = compute_quote(&req);

    match quote {
        Ok(response) => (StatusCode::OK, Json(ApiResponse::ok(response))).into_response(),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::err(e.to_string())),
        )
            .into_response(),
    }
}

fn compute_quote(req: &QuoteRequest) -> Result<QuoteResponse, PricingError> {
    let cost = unit_cost(req.ingredient_cost, req.monthly_labor, req.daily_production)?;
    let price = final_price(cost, req.margin_percent)?;
    let volume = monthly_volume(req.daily_production);
    let profit = projected_profit(cost, price, volume)?;

    Ok(QuoteResponse {
        unit_cost: cost,
        suggested_price: price,
        monthly_volume: volume,
        projected_monthly_profit: profit,
    })
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() {
    println!("🌐 Snackonomics - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // Open database
    let db_path = std::env::var("SNACK_DB").unwrap_or_else(|_| "observations.db".to_string());

    let conn = Connection::open(&db_path).expect("Failed to open database");
    setup_database(&conn).expect("Failed to initialize database");
    println!("✓ Database opened: {}", db_path);

    // Create shared state
    let state = AppState {
        db: Arc::new(Mutex::new(conn)),
    };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/observations", get(get_observations))
        .route("/elasticity/latest", get(get_latest_elasticity))
        .route("/stats", get(get_stats))
        .route("/quote", post(post_quote))
        .with_state(state.clone());

    // Build main router
    let app = Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    // Start server
    let addr = "0.0.0.0:3000";
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    println!("\n🚀 Server running on http://localhost:3000");
    println!("   Observations: http://localhost:3000/api/observations");
    println!("   Stats:        http://localhost:3000/api/stats");
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_quote() {
        let quote = compute_quote(&QuoteRequest {
            ingredient_cost: 2.5,
            monthly_labor: 3000.0,
            daily_production: 100.0,
            margin_percent: 30.0,
        })
        .unwrap();

        assert!((quote.unit_cost - 3.5).abs() < 1e-9);
        assert!((quote.suggested_price - 4.55).abs() < 1e-9);
        assert!((quote.monthly_volume - 3000.0).abs() < 1e-9);
        // (4.55 - 3.5) * 3000
        assert!((quote.projected_monthly_profit - 3150.0).abs() < 1e-9);
    }

    #[test]
    fn test_compute_quote_rejects_zero_production() {
        let result = compute_quote(&QuoteRequest {
            ingredient_cost: 2.5,
            monthly_labor: 3000.0,
            daily_production: 0.0,
            margin_percent: 30.0,
        });

        assert!(matches!(result, Err(PricingError::InvalidInput(_))));
    }
}
