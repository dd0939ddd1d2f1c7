//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Optional REST surface for the sizing engine."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use crate::model::ElectricalInput;

#[cfg(feature = "rest-api")]
pub use rest::router;

#[cfg(feature = "rest-api")]
mod rest {
    use axum::{
        extract::State,
        routing::{get, post},
        Json, Router,
    };
    use std::sync::Arc;

    use crate::{compute, model::ElectricalOutput, tables::LookupTables};

    use super::ComputeRequest;

    #[derive(Clone)]
    pub struct CalcEngineState {
        tables: Arc<LookupTables>,
    }

    pub fn router(tables: LookupTables) -> Router {
        Router::new()
            .route("/api/calc/electrical", post(electrical))
            .route("/api/calc/catalog/issues", get(catalog_issues))
            .with_state(CalcEngineState {
                tables: Arc::new(tables),
            })
    }

    async fn electrical(
        State(state): State<CalcEngineState>,
        Json(payload): Json<ComputeRequest>,
    ) -> Json<ElectricalOutput> {
        Json(compute(&payload.input, &state.tables))
    }

    async fn catalog_issues(State(state): State<CalcEngineState>) -> Json<Vec<String>> {
        Json(state.tables.validate())
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ComputeRequest {
    #[serde(flatten)]
    pub input: ElectricalInput,
}
