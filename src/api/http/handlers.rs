// src/api/http/handlers.rs
// Read-only endpoints: service info, health, persona lookup and dataset statistics

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

use crate::api::error::{ApiError, ApiResult};
use crate::api::types::{HealthResponse, RootResponse};
use crate::persona::DatasetStats;
use crate::state::{AppState, Readiness};

/// Service banner
pub async fn root_handler(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    let ctx = &app_state.context;
    let snapshot = ctx.snapshot();
    let status = match snapshot.readiness {
        Readiness::Starting => "starting",
        Readiness::Ready => "running",
        Readiness::Failed => "error",
    };

    Json(RootResponse {
        message: format!(
            "Persona Chat Server v{} with {}",
            env!("CARGO_PKG_VERSION"),
            ctx.model_id()
        ),
        status: status.to_string(),
        model: ctx.model_id().to_string(),
        model_loaded: snapshot.model_loaded,
        personas_loaded: snapshot.personas_loaded,
        total_personas: snapshot.total_personas,
        startup_error: snapshot.startup_error,
    })
}

/// Health check handler
pub async fn health_handler(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    let ctx = &app_state.context;
    let snapshot = ctx.snapshot();
    let status = match snapshot.readiness {
        Readiness::Starting => "starting",
        Readiness::Ready => "healthy",
        Readiness::Failed => "unhealthy",
    };

    Json(HealthResponse {
        status: status.to_string(),
        model: ctx.model_id().to_string(),
        model_loaded: snapshot.model_loaded,
        personas_loaded: snapshot.personas_loaded,
        total_personas: snapshot.total_personas,
        startup_error: snapshot.startup_error,
        model_error: snapshot.model_error,
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Full dataset row for one persona
pub async fn get_persona_handler(
    State(app_state): State<Arc<AppState>>,
    Path(persona_id): Path<i64>,
) -> impl IntoResponse {
    let result: ApiResult<_> = async {
        let personas = app_state.context.personas()?;
        let record = personas.resolve(persona_id)?;
        debug!(persona_id, "persona lookup");
        Ok(Json(record.clone()))
    }
    .await;

    match result {
        Ok(response) => response.into_response(),
        Err(error) => error.into_response(),
    }
}

/// Dataset statistics. Recomputed on every call.
pub async fn stats_handler(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    let result: ApiResult<_> = async {
        let personas = Arc::clone(app_state.context.personas()?);
        let stats = tokio::task::spawn_blocking(move || DatasetStats::compute(&personas))
            .await
            .map_err(|e| ApiError::internal(format!("Statistics task failed: {}", e)))?;
        Ok(Json(stats))
    }
    .await;

    match result {
        Ok(response) => response.into_response(),
        Err(error) => error.into_response(),
    }
}
