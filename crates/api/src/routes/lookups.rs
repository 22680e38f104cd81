//! Public CEP and CNPJ lookups used to prefill forms.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::ClientIp;
use crate::middleware::enforce;
use crate::services::lookup::{CepInfo, CnpjInfo, LookupError};

impl From<LookupError> for ApiError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::InvalidInput(msg) => ApiError::Validation(msg),
            LookupError::NotFound(what) => ApiError::NotFound(format!("{} not found", what)),
            LookupError::Upstream(_) => {
                ApiError::ServiceUnavailable("Lookup service unavailable".to_string())
            }
        }
    }
}

/// GET /api/lookup/cep/:cep
pub async fn cep(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Path(raw): Path<String>,
) -> Result<Json<CepInfo>, ApiError> {
    enforce(&state, "lookup", &ip, state.config.rate_limit.lookup).await?;
    Ok(Json(state.lookups.cep(&raw).await?))
}

/// GET /api/lookup/cnpj/:cnpj
pub async fn cnpj(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Path(raw): Path<String>,
) -> Result<Json<CnpjInfo>, ApiError> {
    enforce(&state, "lookup", &ip, state.config.rate_limit.lookup).await?;
    Ok(Json(state.lookups.cnpj(&raw).await?))
}
