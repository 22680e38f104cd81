//! CEP (ViaCEP) and CNPJ (BrasilAPI) lookups used to prefill forms.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::config::LookupConfig;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Upstream lookup failed: {0}")]
    Upstream(String),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CepInfo {
    pub cep: String,
    pub street: Option<String>,
    pub complement: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub uf: Option<String>,
    pub ibge: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ViaCepResponse {
    #[serde(default)]
    erro: Option<serde_json::Value>,
    cep: Option<String>,
    logradouro: Option<String>,
    complemento: Option<String>,
    bairro: Option<String>,
    localidade: Option<String>,
    uf: Option<String>,
    ibge: Option<String>,
}

impl ViaCepResponse {
    fn is_error(&self) -> bool {
        match &self.erro {
            Some(serde_json::Value::Bool(b)) => *b,
            Some(serde_json::Value::String(s)) => s == "true",
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CnpjInfo {
    pub cnpj: String,
    pub company_name: Option<String>,
    pub trade_name: Option<String>,
    pub registration_status: Option<String>,
    pub street: Option<String>,
    pub number: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub uf: Option<String>,
    pub cep: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BrasilApiCnpj {
    razao_social: Option<String>,
    nome_fantasia: Option<String>,
    descricao_situacao_cadastral: Option<String>,
    logradouro: Option<String>,
    numero: Option<String>,
    bairro: Option<String>,
    municipio: Option<String>,
    uf: Option<String>,
    cep: Option<String>,
    ddd_telefone_1: Option<String>,
    email: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[derive(Clone)]
pub struct LookupService {
    client: reqwest::Client,
    viacep_url: String,
    brasilapi_url: String,
    timeout: Duration,
}

impl LookupService {
    pub fn new(config: &LookupConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            viacep_url: config.viacep_url.trim_end_matches('/').to_string(),
            brasilapi_url: config.brasilapi_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    pub async fn cep(&self, raw: &str) -> Result<CepInfo, LookupError> {
        let cep = shared::validation::normalize_cep(raw)
            .ok_or_else(|| LookupError::InvalidInput("CEP must have 8 digits".into()))?;

        let url = format!("{}/{}/json/", self.viacep_url, cep);
        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| upstream("viacep", e.to_string()))?;

        match response.status() {
            s if s.is_success() => {}
            s if s.as_u16() == 400 || s.as_u16() == 404 => return Err(LookupError::NotFound("CEP")),
            s => return Err(upstream("viacep", format!("status {}", s))),
        }

        let body: ViaCepResponse = response
            .json()
            .await
            .map_err(|e| upstream("viacep", e.to_string()))?;
        if body.is_error() {
            return Err(LookupError::NotFound("CEP"));
        }

        Ok(CepInfo {
            cep: non_empty(body.cep)
                .map(|c| shared::validation::normalize_digits(&c))
                .unwrap_or(cep),
            street: non_empty(body.logradouro),
            complement: non_empty(body.complemento),
            neighborhood: non_empty(body.bairro),
            city: non_empty(body.localidade),
            uf: non_empty(body.uf),
            ibge: non_empty(body.ibge),
        })
    }

    pub async fn cnpj(&self, raw: &str) -> Result<CnpjInfo, LookupError> {
        let cnpj = shared::validation::normalize_digits(raw);
        if !shared::validation::is_valid_cnpj(&cnpj) {
            return Err(LookupError::InvalidInput("Invalid CNPJ".into()));
        }

        let url = format!("{}/{}", self.brasilapi_url, cnpj);
        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| upstream("brasilapi", e.to_string()))?;

        match response.status() {
            s if s.is_success() => {}
            s if s.as_u16() == 404 => return Err(LookupError::NotFound("CNPJ")),
            s => return Err(upstream("brasilapi", format!("status {}", s))),
        }

        let body: BrasilApiCnpj = response
            .json()
            .await
            .map_err(|e| upstream("brasilapi", e.to_string()))?;

        Ok(CnpjInfo {
            cnpj,
            company_name: non_empty(body.razao_social),
            trade_name: non_empty(body.nome_fantasia),
            registration_status: non_empty(body.descricao_situacao_cadastral),
            street: non_empty(body.logradouro),
            number: non_empty(body.numero),
            neighborhood: non_empty(body.bairro),
            city: non_empty(body.municipio),
            uf: non_empty(body.uf),
            cep: non_empty(body.cep).map(|c| shared::validation::normalize_digits(&c)),
            phone: non_empty(body.ddd_telefone_1),
            email: non_empty(body.email),
        })
    }
}

fn upstream(provider: &str, detail: String) -> LookupError {
    warn!(provider = provider, error = %detail, "Lookup upstream failure");
    LookupError::Upstream(format!("{}: {}", provider, detail))
}
