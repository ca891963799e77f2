//! HTTP Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use clearflow_checkout::{
    BillingCycle, BillingField, CheckoutError, CheckoutFlow, CheckoutView, Locale, PaymentMethod,
    PlanOffer, PlanTier, SUPPORTED_COUNTRIES, SessionId, TextDirection, catalog,
};

use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub gateway: String,
    pub registered_checkouts: usize,
    pub open_checkouts: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct PlansQuery {
    #[serde(default)]
    pub cycle: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CountryOption {
    pub code: &'static str,
    pub name: &'static str,
}

#[derive(Debug, Serialize)]
pub struct LocaleResponse {
    pub locale: Locale,
    pub lang: &'static str,
    pub direction: TextDirection,
}

#[derive(Debug, Deserialize)]
pub struct OpenCheckoutRequest {
    pub tier: String,
    #[serde(default)]
    pub cycle: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SelectMethodRequest {
    /// Omitted means "continue with the current method"
    #[serde(default)]
    pub method: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FieldUpdate {
    pub field: String,
    pub value: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn api_error(err: &CheckoutError) -> ApiError {
    let (status, code) = match err {
        CheckoutError::MissingFields(_) => (StatusCode::BAD_REQUEST, "MISSING_FIELDS"),
        CheckoutError::UnknownField(_) => (StatusCode::BAD_REQUEST, "UNKNOWN_FIELD"),
        CheckoutError::UnknownMethod(_) => (StatusCode::BAD_REQUEST, "UNKNOWN_METHOD"),
        CheckoutError::UnknownCycle(_) => (StatusCode::BAD_REQUEST, "UNKNOWN_CYCLE"),
        CheckoutError::UnknownTier(_) | CheckoutError::InvalidPlan(_) => {
            (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_PLAN")
        }
        CheckoutError::InvalidTransition { .. } => (StatusCode::CONFLICT, "INVALID_TRANSITION"),
        CheckoutError::NotOpen => (StatusCode::NOT_FOUND, "CHECKOUT_CLOSED"),
        CheckoutError::Config(_) | CheckoutError::TaskFailed(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "CHECKOUT_ERROR")
        }
    };
    (
        status,
        Json(ErrorResponse {
            error: err.user_message(),
            code: code.into(),
        }),
    )
}

fn not_found() -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "Checkout not found".into(),
            code: "CHECKOUT_NOT_FOUND".into(),
        }),
    )
}

fn find_flow(state: &AppState, id: &str) -> Result<std::sync::Arc<CheckoutFlow>, ApiError> {
    state
        .flows
        .get(&SessionId::from_string(id))
        .ok_or_else(not_found)
}

fn render(state: &AppState, flow: &CheckoutFlow) -> Json<CheckoutView> {
    Json(flow.view(state.locale.direction()))
}

fn locale_response(locale: Locale) -> Json<LocaleResponse> {
    Json(LocaleResponse {
        locale,
        lang: locale.tag(),
        direction: locale.direction(),
    })
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        gateway: state.gateway.name().to_string(),
        registered_checkouts: state.flows.len(),
        open_checkouts: state.scroll_lock.holders(),
    })
}

/// Pricing catalog for a billing cycle (monthly by default)
pub async fn list_plans(Query(query): Query<PlansQuery>) -> ApiResult<Vec<PlanOffer>> {
    let cycle = match query.cycle.as_deref() {
        Some(raw) => raw.parse::<BillingCycle>().map_err(|e| api_error(&e))?,
        None => BillingCycle::default(),
    };
    Ok(Json(catalog(cycle)))
}

/// Country picker options
pub async fn list_countries() -> Json<Vec<CountryOption>> {
    Json(
        SUPPORTED_COUNTRIES
            .iter()
            .map(|&(code, name)| CountryOption { code, name })
            .collect(),
    )
}

pub async fn get_locale(State(state): State<AppState>) -> Json<LocaleResponse> {
    locale_response(state.locale.current())
}

pub async fn toggle_locale(State(state): State<AppState>) -> Json<LocaleResponse> {
    locale_response(state.locale.toggle())
}

/// Open a checkout for the chosen plan
pub async fn open_checkout(
    State(state): State<AppState>,
    Json(payload): Json<OpenCheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutView>), ApiError> {
    let tier = payload.tier.parse::<PlanTier>().map_err(|e| api_error(&e))?;
    let cycle = match payload.cycle.as_deref() {
        Some(raw) => raw.parse::<BillingCycle>().map_err(|e| api_error(&e))?,
        None => BillingCycle::default(),
    };

    let (id, flow) = state.open_flow(tier.plan(cycle)).map_err(|e| {
        tracing::warn!("Checkout open failed: {}", e);
        api_error(&e)
    })?;
    tracing::debug!(session = %id, tier = tier.as_str(), cycle = cycle.as_str(), "Checkout created");

    Ok((StatusCode::CREATED, render(&state, &flow)))
}

pub async fn get_checkout(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<CheckoutView> {
    let flow = find_flow(&state, &id)?;
    Ok(render(&state, &flow))
}

/// Pick a payment method (or keep the current one) and move to the billing form
pub async fn select_method(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<SelectMethodRequest>,
) -> ApiResult<CheckoutView> {
    let flow = find_flow(&state, &id)?;
    let result = match payload.method.as_deref() {
        Some(raw) => {
            let method = raw.parse::<PaymentMethod>().map_err(|e| api_error(&e))?;
            flow.select_method(method)
        }
        None => flow.advance_to_details(),
    };
    result.map_err(|e| api_error(&e))?;
    Ok(render(&state, &flow))
}

pub async fn go_back(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<CheckoutView> {
    let flow = find_flow(&state, &id)?;
    flow.return_to_method_selection().map_err(|e| api_error(&e))?;
    Ok(render(&state, &flow))
}

pub async fn update_field(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<FieldUpdate>,
) -> ApiResult<CheckoutView> {
    let flow = find_flow(&state, &id)?;
    let field = payload.field.parse::<BillingField>().map_err(|e| api_error(&e))?;
    flow.set_field(field, payload.value).map_err(|e| api_error(&e))?;
    Ok(render(&state, &flow))
}

/// Submit the billing form; the response shows the `processing` step
pub async fn submit(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<CheckoutView>), ApiError> {
    let flow = find_flow(&state, &id)?;
    let ticket = flow.submit().map_err(|e| api_error(&e))?;
    tracing::debug!(session = %ticket.session_id(), "Payment in flight");
    Ok((StatusCode::ACCEPTED, render(&state, &flow)))
}

/// Close the checkout and forget it
pub async fn close_checkout(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let flow = state
        .flows
        .remove(&SessionId::from_string(id))
        .ok_or_else(not_found)?;
    flow.close();
    Ok(StatusCode::NO_CONTENT)
}
