//! Shared HTTP API types
//!
//! Pure data types with no HTTP framework dependency; the query service
//! wraps them in axum handlers.

pub mod types;

pub use types::{
    AlleleRequest, BeaconError, BeaconInfo, BeaconResponse, DatasetAlleleResponse, DatasetInfo,
    OrganizationInfo,
};
