use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Extension, Query};
use axum::response::{IntoResponse, Response};
use axum::Json;
use calc_core::config::validate_settings;
use calc_core::session::ANSWER_VARIABLE;
use calc_core::{CalcResult, CalculatorContext, Session};
use tracing::info;

use crate::dto::{
    CalculateQuery, CalculateRequest, CalculateResponse, HealthResponse, OrdinalCalculateResponse, TypeFormat,
};
use crate::error::ApiError;
use crate::AppState;

pub async fn calculate(
    Extension(state): Extension<Arc<AppState>>,
    query: Result<Query<CalculateQuery>, QueryRejection>,
    payload: Result<Json<CalculateRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let Json(request) = payload?;
    let response = evaluate_request(&request, &state.defaults)?;
    info!(
        expression_len = request.expression.len(),
        variables = request.context.variables.len(),
        is_error = response.error.is_some(),
        "calculated"
    );
    Ok(match query.types {
        TypeFormat::Name => Json(response).into_response(),
        TypeFormat::Ordinal => Json(OrdinalCalculateResponse::from(&response)).into_response(),
    })
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Evaluate one request against `defaults`.
///
/// Request variables are each evaluated in a fresh context holding only the
/// settings, then bound by name on top of the configured variables. The
/// expression runs last, so it sees all of them and may add its own binding.
/// Only invalid settings fail the request; everything else is an error value.
pub fn evaluate_request(request: &CalculateRequest, defaults: &CalculatorContext) -> CalcResult<CalculateResponse> {
    let overrides = &request.context;
    let mut context = defaults.clone();
    if let Some(timezone) = &overrides.timezone {
        context.timezone = timezone.clone();
    }
    if let Some(ppi) = overrides.ppi {
        context.ppi = ppi;
    }
    if let Some(em_size) = overrides.em_size {
        context.em_size = em_size;
    }
    validate_settings(&context.timezone, context.ppi, context.em_size)?;

    let fresh = context.settings_only();
    for (name, expression) in &overrides.variables {
        let value = Session::new(fresh.clone()).evaluate_line(expression).into_value();
        context.bind(name.clone(), value);
    }

    let mut session = Session::new(context);
    let result = session.evaluate_line(&request.expression).into_value();
    let mut context = session.into_context();
    context.unbind(ANSWER_VARIABLE);

    let error = result.error_msg().map(str::to_string);
    Ok(CalculateResponse {
        result,
        variables: context.variables.into_iter().collect(),
        error,
    })
}
