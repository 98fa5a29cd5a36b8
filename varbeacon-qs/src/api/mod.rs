//! HTTP API handlers for varbeacon-qs

pub mod health;
pub mod info;
pub mod query;

pub use health::health_routes;
pub use info::get_info;
pub use query::{query_get, query_post, BeaconReply};
