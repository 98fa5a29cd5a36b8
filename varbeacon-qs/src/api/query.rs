//! Allele query endpoint
//!
//! `GET /query` takes the allele request as query parameters, `POST /query`
//! as a form or JSON body. The client key is the raw `Authorization` header;
//! requests without one are evaluated under the public key.

use axum::{
    extract::{rejection::QueryRejection, FromRequest, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use tracing::{error, warn};
use varbeacon_common::api::{AlleleRequest, BeaconResponse};
use varbeacon_common::engine::{QueryOutcome, RawQuery, Rejection};

use crate::AppState;

/// Beacon response with the HTTP status it is sent under
#[derive(Debug)]
pub struct BeaconReply {
    pub status: StatusCode,
    pub body: BeaconResponse,
}

impl BeaconReply {
    fn rejected(state: &AppState, raw: &RawQuery, status: StatusCode, message: String) -> Self {
        let echo = AlleleRequest::from_raw(raw, &state.engine.settings().default_assembly);
        Self {
            status,
            body: BeaconResponse::rejected(&state.beacon, echo, status.as_u16(), message),
        }
    }
}

impl IntoResponse for BeaconReply {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn rejection_status(rejection: &Rejection) -> (StatusCode, String) {
    match rejection {
        Rejection::InvalidInput(e) => (
            StatusCode::BAD_REQUEST,
            format!("The input format is invalid: {}", e),
        ),
        Rejection::Unauthenticated => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
        Rejection::QuotaExceeded { limit, .. } => (
            StatusCode::TOO_MANY_REQUESTS,
            format!("Daily access limit of {} queries reached", limit),
        ),
    }
}

fn client_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|key| !key.is_empty())
}

async fn evaluate(state: &AppState, headers: &HeaderMap, raw: RawQuery) -> BeaconReply {
    match state.engine.evaluate(&raw, client_key(headers)).await {
        Ok(QueryOutcome::Answered(answer)) => BeaconReply {
            status: StatusCode::OK,
            body: BeaconResponse::answered(&state.beacon, &raw, &answer),
        },
        Ok(QueryOutcome::Rejected(rejection)) => {
            let (status, message) = rejection_status(&rejection);
            BeaconReply::rejected(state, &raw, status, message)
        }
        Err(e) => {
            error!(error = %e, "Query evaluation failed");
            BeaconReply::rejected(
                state,
                &raw,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

fn unreadable(state: &AppState, reason: String) -> BeaconReply {
    warn!(reason = %reason, "Rejected unreadable query");
    BeaconReply::rejected(
        state,
        &RawQuery::default(),
        StatusCode::BAD_REQUEST,
        format!("The input format is invalid: {}", reason),
    )
}

/// GET /query
pub async fn query_get(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<RawQuery>, QueryRejection>,
) -> BeaconReply {
    match query {
        Ok(Query(raw)) => evaluate(&state, &headers, raw).await,
        Err(e) => unreadable(&state, e.body_text()),
    }
}

/// POST /query
pub async fn query_post(State(state): State<AppState>, request: Request) -> BeaconReply {
    let headers = request.headers().clone();
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|content_type| content_type.starts_with("application/json"));

    let raw = if is_json {
        Json::<RawQuery>::from_request(request, &state)
            .await
            .map(|Json(raw)| raw)
            .map_err(|e| e.body_text())
    } else {
        Form::<RawQuery>::from_request(request, &state)
            .await
            .map(|Form(raw)| raw)
            .map_err(|e| e.body_text())
    };

    match raw {
        Ok(raw) => evaluate(&state, &headers, raw).await,
        Err(reason) => unreadable(&state, reason),
    }
}
