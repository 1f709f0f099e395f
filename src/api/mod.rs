//! HTTP surface: the axum router wiring every route from the external
//! interface table to its handler module.

mod configuration;
mod function;
mod monitoring;
mod peer;
mod system;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::state::NodeState;

#[derive(Serialize)]
struct Hello {
    name: &'static str,
    version: &'static str,
}

async fn hello() -> Json<Hello> {
    Json(Hello {
        name: "p2pfaas-scheduler",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn metrics(axum::extract::State(state): axum::extract::State<Arc<NodeState>>) -> String {
    state.metrics.render()
}

pub fn router(state: Arc<NodeState>) -> Router {
    Router::new()
        .route("/", get(hello))
        .route("/function/:name", get(function::execute).post(function::execute))
        .route("/peer/function/:name", post(peer::execute))
        .route("/monitoring/load", get(monitoring::load))
        .route("/monitoring/scale-delay/:name", get(monitoring::scale_delay))
        .route(
            "/configuration",
            get(configuration::get_configuration).post(configuration::set_configuration),
        )
        .route(
            "/configuration/scheduler",
            get(configuration::get_scheduler).post(configuration::set_scheduler),
        )
        .route("/system/functions", get(system::list_functions))
        .route("/system/function/:name", get(system::get_function))
        .route("/system/scale-function/:name", post(system::scale_function))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
