//! Transactional email.
//!
//! Providers:
//! - `console`: logs the message (development)
//! - `sendgrid`: SendGrid v3 mail send API
//!
//! Handlers never wait on delivery: [`EmailService::send_in_background`]
//! spawns the send and logs failures.

use crate::config::EmailConfig;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email service not configured")]
    NotConfigured,

    #[error("Failed to send email: {0}")]
    SendFailed(String),

    #[error("Provider error: {0}")]
    ProviderError(String),
}

#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub body_text: String,
}

#[derive(Clone)]
pub struct EmailService {
    config: Arc<EmailConfig>,
    client: reqwest::Client,
}

impl EmailService {
    pub fn new(config: EmailConfig, client: reqwest::Client) -> Self {
        Self {
            config: Arc::new(config),
            client,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        if !self.config.enabled {
            debug!(
                to = %message.to,
                subject = %message.subject,
                "Email service disabled, skipping send"
            );
            return Ok(());
        }

        match self.config.provider.as_str() {
            "console" => {
                info!(
                    to = %message.to,
                    subject = %message.subject,
                    body = %message.body_text,
                    "Email (console provider)"
                );
                Ok(())
            }
            "sendgrid" => self.send_sendgrid(message).await,
            provider => {
                error!(provider = %provider, "Unknown email provider");
                Err(EmailError::NotConfigured)
            }
        }
    }

    /// Sends without blocking the caller; failures are logged.
    pub fn send_in_background(&self, message: EmailMessage) {
        if !self.config.enabled {
            return;
        }
        let service = self.clone();
        tokio::spawn(async move {
            let to = message.to.clone();
            if let Err(e) = service.send(message).await {
                warn!(to = %to, error = %e, "Failed to send email");
            }
        });
    }

    async fn send_sendgrid(&self, message: EmailMessage) -> Result<(), EmailError> {
        if self.config.sendgrid_api_key.is_empty() {
            return Err(EmailError::NotConfigured);
        }

        let mut to = json!({ "email": message.to });
        if let Some(name) = &message.to_name {
            to["name"] = json!(name);
        }
        let payload = json!({
            "personalizations": [{ "to": [to] }],
            "from": {
                "email": self.config.sender_email,
                "name": self.config.sender_name,
            },
            "subject": message.subject,
            "content": [{ "type": "text/plain", "value": message.body_text }],
        });

        let response = self
            .client
            .post(&self.config.sendgrid_url)
            .bearer_auth(&self.config.sendgrid_api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| EmailError::SendFailed(e.to_string()))?;

        if response.status().is_success() {
            debug!(to = %message.to, "Email sent via SendGrid");
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(EmailError::ProviderError(format!("{}: {}", status, body)))
        }
    }

    fn login_url(&self) -> String {
        format!("{}/login", self.config.base_url.trim_end_matches('/'))
    }

    pub fn account_created(
        &self,
        to_email: &str,
        to_name: &str,
        temporary_password: Option<&str>,
    ) -> EmailMessage {
        let credentials = match temporary_password {
            Some(password) => format!(
                "Sua senha temporária é: {}\nVocê deverá escolher uma nova senha no primeiro acesso.",
                password
            ),
            None => "Use a senha definida pelo administrador para entrar.".to_string(),
        };
        EmailMessage {
            to: to_email.to_string(),
            to_name: Some(to_name.to_string()),
            subject: "Sua conta no Comprar & Construir".to_string(),
            body_text: format!(
                "Olá {},\n\nUma conta foi criada para você.\n\nLogin: {}\n{}\n\nAcesse: {}\n",
                to_name,
                to_email,
                credentials,
                self.login_url()
            ),
        }
    }

    /// Notice of an admin reset. The password is included only when it was
    /// generated; one typed by the admin is passed on out of band.
    pub fn password_reset(
        &self,
        to_email: &str,
        to_name: &str,
        temporary_password: Option<&str>,
    ) -> EmailMessage {
        let credentials = match temporary_password {
            Some(password) => format!("Senha temporária: {}\n", password),
            None => "Solicite a nova senha ao administrador.\n".to_string(),
        };
        EmailMessage {
            to: to_email.to_string(),
            to_name: Some(to_name.to_string()),
            subject: "Sua senha foi redefinida".to_string(),
            body_text: format!(
                "Olá {},\n\nUm administrador redefiniu sua senha.\n{}\
                 Você deverá escolher uma nova senha no próximo acesso.\n\nAcesse: {}\n",
                to_name,
                credentials,
                self.login_url()
            ),
        }
    }

    pub fn new_proposal(
        &self,
        to_email: &str,
        to_name: &str,
        quote_title: &str,
        supplier_name: &str,
    ) -> EmailMessage {
        let dashboard_url = format!(
            "{}/dashboard/cliente",
            self.config.base_url.trim_end_matches('/')
        );
        EmailMessage {
            to: to_email.to_string(),
            to_name: Some(to_name.to_string()),
            subject: format!("Nova proposta para \"{}\"", quote_title),
            body_text: format!(
                "Olá {},\n\n{} enviou uma proposta para a cotação \"{}\".\n\nAcesse: {}\n",
                to_name, supplier_name, quote_title, dashboard_url
            ),
        }
    }
}
