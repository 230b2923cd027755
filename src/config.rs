//! Configuração do quadro carregada a partir de `gigboard.toml`.
//!
//! A struct [`BoardConfig`] reúne preços, fluxo de conclusão, tempos do
//! datastore e acesso à planilha. Valores ausentes usam defaults sensíveis.
//! A variável de ambiente `GIGBOARD_SHEETS_TOKEN` tem precedência sobre o
//! arquivo para o token de acesso.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::pricing::PricingPolicy;
use crate::state_machine::CompletionFlow;
use crate::store::StoreConfig;

/// Nome do arquivo procurado no diretório atual.
pub const CONFIG_FILE: &str = "gigboard.toml";

/// Variável de ambiente com o token da API de planilhas.
pub const TOKEN_ENV: &str = "GIGBOARD_SHEETS_TOKEN";

/// Configuração de nível superior carregada de `gigboard.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoardConfig {
    #[serde(default)]
    pub pricing: PricingPolicy,

    #[serde(default)]
    pub lifecycle: LifecycleConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub sheets: SheetsConfig,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Conclusão direta ou com etapa de espera por feedback.
    #[serde(default)]
    pub completion_flow: CompletionFlow,
}

/// Acesso à planilha que guarda os jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetsConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub spreadsheet_id: String,

    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,

    /// Token OAuth já emitido; a obtenção do token fica fora deste crate.
    #[serde(default)]
    pub access_token: String,
}

// Endpoint público da API Google Sheets.
fn default_base_url() -> String {
    "https://sheets.googleapis.com".to_string()
}

// Primeira aba de uma planilha nova.
fn default_sheet_name() -> String {
    "Sheet1".to_string()
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            spreadsheet_id: String::new(),
            sheet_name: default_sheet_name(),
            access_token: String::new(),
        }
    }
}

impl BoardConfig {
    /// Carrega a configuração de `path`, ou de `gigboard.toml` no diretório
    /// atual. Usa valores padrão se o arquivo não existir.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.unwrap_or_else(|| Path::new(CONFIG_FILE));
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Self::from_toml(&contents)?
        } else {
            Self::default()
        };

        // Variável de ambiente tem precedência sobre o arquivo para o token.
        if let Ok(token) = std::env::var(TOKEN_ENV)
            && !token.is_empty()
        {
            config.sheets.access_token = token;
        }

        Ok(config)
    }

    /// Interpreta e valida um documento TOML.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: BoardConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pricing.validate()?;
        if self.store.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "store.request_timeout_ms must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Verifica se há o mínimo para falar com a planilha.
    pub fn require_sheets(&self) -> Result<&SheetsConfig, ConfigError> {
        if self.sheets.spreadsheet_id.is_empty() {
            return Err(ConfigError::Invalid("sheets.spreadsheet_id is not set".into()));
        }
        if self.sheets.access_token.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "no sheets access token: set sheets.access_token or {TOKEN_ENV}"
            )));
        }
        Ok(&self.sheets)
    }
}
