use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;

use axum::{
    Router,
    extract::Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::core::{
    Branch, BranchImpact, DEFAULT_SEED, Profile, SIMULATION_RUNS, SimConfig, WorldlineCandidate,
    default_branches, default_candidate_budget, find_most_impactful_branch,
    generate_worldline_candidates, run_simulation_with, score_candidates,
};

const MAX_RUNS: u32 = 20_000;

#[derive(Clone, Debug, Serialize)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid profile")]
    InvalidProfile(Vec<ValidationError>),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    details: Vec<ValidationError>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::InvalidProfile(details) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorResponse {
                    error: "invalid profile".to_string(),
                    details,
                },
            ),
            Self::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: message,
                    details: Vec::new(),
                },
            ),
            Self::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: message,
                    details: Vec::new(),
                },
            ),
        };
        json_response(status, body)
    }
}

// Host-side validation; the core itself never validates. Collects every
// problem instead of failing on the first one.
pub fn validate_profile(profile: &Profile) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if profile.current_age >= profile.target_retire_age {
        errors.push(ValidationError {
            field: "targetRetireAge",
            message: "must be greater than currentAge".to_string(),
        });
    }
    if profile.target_retire_age > 100 {
        errors.push(ValidationError {
            field: "targetRetireAge",
            message: "must be at most 100".to_string(),
        });
    }
    if profile.current_age > 100 {
        errors.push(ValidationError {
            field: "currentAge",
            message: "must be at most 100".to_string(),
        });
    }

    for (field, value) in [
        ("grossIncome", profile.gross_income),
        ("rsuAnnual", profile.rsu_annual),
        ("sideIncomeNet", profile.side_income_net),
        ("partnerGrossIncome", profile.partner_gross_income),
        ("partnerRsuAnnual", profile.partner_rsu_annual),
        ("livingCostAnnual", profile.living_cost_annual),
        ("housingCostAnnual", profile.housing_cost_annual),
        ("assetCash", profile.asset_cash),
        ("assetInvest", profile.asset_invest),
        ("assetDc", profile.asset_dc),
        ("dcContributionAnnual", profile.dc_contribution_annual),
        ("retirePassiveIncome", profile.retire_passive_income),
        ("postRetireIncome", profile.post_retire_income),
    ] {
        if !value.is_finite() || value < 0.0 {
            errors.push(ValidationError {
                field,
                message: "must be a non-negative number".to_string(),
            });
        }
    }

    if !profile.volatility.is_finite() || profile.volatility < 0.0 {
        errors.push(ValidationError {
            field: "volatility",
            message: "must be a non-negative number".to_string(),
        });
    }
    if !profile.expected_return.is_finite() {
        errors.push(ValidationError {
            field: "expectedReturn",
            message: "must be a finite number".to_string(),
        });
    }
    if !profile.inflation_rate.is_finite() || profile.inflation_rate <= -100.0 {
        errors.push(ValidationError {
            field: "inflationRate",
            message: "must be greater than -100".to_string(),
        });
    }
    if let Some(rate) = profile.rent_inflation_rate
        && (!rate.is_finite() || rate <= -100.0)
    {
        errors.push(ValidationError {
            field: "rentInflationRate",
            message: "must be greater than -100".to_string(),
        });
    }
    if !(0.0..=100.0).contains(&profile.effective_tax_rate) {
        errors.push(ValidationError {
            field: "effectiveTaxRate",
            message: "must be between 0 and 100".to_string(),
        });
    }
    if !profile.retire_spending_multiplier.is_finite()
        || profile.retire_spending_multiplier < 0.0
    {
        errors.push(ValidationError {
            field: "retireSpendingMultiplier",
            message: "must be a non-negative number".to_string(),
        });
    }

    for event in &profile.life_events {
        if event.age > 100 {
            errors.push(ValidationError {
                field: "lifeEvents",
                message: format!("event '{}' starts after age 100", event.id),
            });
        }
    }

    errors
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SimulateRequest {
    profile: Profile,
    #[serde(default)]
    seed: Option<u64>,
    #[serde(default)]
    runs: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct BranchesRequest {
    profile: Profile,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorldlinesRequest {
    profile: Profile,
    // Omitted branches fall back to the full default set for the profile.
    #[serde(default)]
    branches: Option<Vec<Branch>>,
    #[serde(default)]
    max: Option<usize>,
    #[serde(default)]
    seed: Option<u64>,
    #[serde(default)]
    runs: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WorldlinesResponse {
    candidates: Vec<WorldlineCandidate>,
    most_impactful: Option<BranchImpact>,
    cancelled: bool,
}

fn sim_config(seed: Option<u64>, runs: Option<u32>) -> Result<SimConfig, ApiError> {
    let runs = runs.unwrap_or(SIMULATION_RUNS);
    if runs == 0 || runs > MAX_RUNS {
        return Err(ApiError::BadRequest(format!(
            "runs must be between 1 and {MAX_RUNS}"
        )));
    }
    Ok(SimConfig {
        runs,
        seed: seed.unwrap_or(DEFAULT_SEED),
    })
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/healthz", get(health_handler))
        .route("/api/simulate", post(simulate_handler))
        .route("/api/branches", post(branches_handler))
        .route("/api/worldlines", post(worldlines_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "worldline simulator listening");

    axum::serve(listener, app).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, serde_json::json!({ "status": "ok" }))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_handler(Json(payload): Json<SimulateRequest>) -> Response {
    let errors = validate_profile(&payload.profile);
    if !errors.is_empty() {
        return ApiError::InvalidProfile(errors).into_response();
    }
    let config = match sim_config(payload.seed, payload.runs) {
        Ok(config) => config,
        Err(err) => return err.into_response(),
    };

    let profile = payload.profile;
    match tokio::task::spawn_blocking(move || run_simulation_with(&profile, &config)).await {
        Ok(result) => json_response(StatusCode::OK, result),
        Err(_) => ApiError::Internal("simulation task failed".to_string()).into_response(),
    }
}

async fn branches_handler(Json(payload): Json<BranchesRequest>) -> Response {
    let errors = validate_profile(&payload.profile);
    if !errors.is_empty() {
        return ApiError::InvalidProfile(errors).into_response();
    }
    json_response(StatusCode::OK, default_branches(&payload.profile))
}

async fn worldlines_handler(Json(payload): Json<WorldlinesRequest>) -> Response {
    let errors = validate_profile(&payload.profile);
    if !errors.is_empty() {
        return ApiError::InvalidProfile(errors).into_response();
    }
    let config = match sim_config(payload.seed, payload.runs) {
        Ok(config) => config,
        Err(err) => return err.into_response(),
    };

    let profile = payload.profile;
    let selected = payload
        .branches
        .unwrap_or_else(|| default_branches(&profile));
    let max = payload.max.unwrap_or_else(default_candidate_budget);
    if max == 0 {
        return ApiError::BadRequest("max must be at least 1".to_string()).into_response();
    }

    let joined = tokio::task::spawn_blocking(move || {
        let candidates = generate_worldline_candidates(&selected, max);
        let cancel = AtomicBool::new(false);
        let run = score_candidates(
            &profile,
            candidates,
            &config,
            |done, total| debug!(done, total, "worldline progress"),
            &cancel,
        );
        let most_impactful = find_most_impactful_branch(&run.candidates);
        WorldlinesResponse {
            candidates: run.candidates,
            most_impactful,
            cancelled: run.cancelled,
        }
    })
    .await;

    match joined {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(_) => ApiError::Internal("worldline task failed".to_string()).into_response(),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
            details: Vec::new(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_passes_validation() {
        assert!(validate_profile(&Profile::default()).is_empty());
    }

    #[test]
    fn retire_age_must_exceed_current_age() {
        let profile = Profile {
            current_age: 60,
            target_retire_age: 55,
            ..Profile::default()
        };
        let errors = validate_profile(&profile);
        assert!(errors.iter().any(|e| e.field == "targetRetireAge"));
    }

    #[test]
    fn negative_money_fields_are_rejected() {
        let profile = Profile {
            gross_income: -1.0,
            asset_cash: -500.0,
            ..Profile::default()
        };
        let errors = validate_profile(&profile);
        assert!(errors.iter().any(|e| e.field == "grossIncome"));
        assert!(errors.iter().any(|e| e.field == "assetCash"));
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let profile = Profile {
            volatility: f64::NAN,
            expected_return: f64::INFINITY,
            ..Profile::default()
        };
        let errors = validate_profile(&profile);
        assert!(errors.iter().any(|e| e.field == "volatility"));
        assert!(errors.iter().any(|e| e.field == "expectedReturn"));
    }

    #[test]
    fn simulate_request_parses_with_defaults() {
        let payload: SimulateRequest =
            serde_json::from_str(r#"{"profile":{"currentAge":30,"targetRetireAge":60}}"#)
                .expect("parse");
        assert_eq!(payload.profile.current_age, 30);
        assert_eq!(payload.seed, None);
        assert_eq!(payload.runs, None);
    }

    #[test]
    fn worldlines_request_accepts_explicit_branches() {
        let json = r#"{
            "profile": {},
            "branches": [{
                "id": "income_down_20",
                "label": "Income -20%",
                "detail": "",
                "certainty": "uncertain",
                "age": 38,
                "eventType": "income_change",
                "eventParams": { "changePercent": -20.0 }
            }],
            "max": 3,
            "seed": 7
        }"#;
        let payload: WorldlinesRequest = serde_json::from_str(json).expect("parse");
        let branches = payload.branches.expect("branches");
        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0].id, "income_down_20");
        assert_eq!(payload.max, Some(3));
    }

    #[test]
    fn run_count_is_bounded() {
        assert!(sim_config(None, Some(0)).is_err());
        assert!(sim_config(None, Some(MAX_RUNS + 1)).is_err());
        let config = sim_config(Some(9), Some(100)).expect("valid");
        assert_eq!(config.runs, 100);
        assert_eq!(config.seed, 9);
    }
}
