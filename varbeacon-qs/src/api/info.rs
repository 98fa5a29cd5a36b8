//! Beacon info endpoint

use axum::{extract::State, Json};
use varbeacon_common::api::BeaconInfo;

use crate::AppState;

/// GET /
///
/// Beacon self-description from configuration. Open to every caller.
pub async fn get_info(State(state): State<AppState>) -> Json<BeaconInfo> {
    Json(BeaconInfo::from(state.beacon.as_ref()))
}
