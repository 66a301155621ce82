//! TOML configuration.
//!
//! ```toml
//! [db]
//! path = "./data/pagegrep.sqlite"
//!
//! [server]
//! bind = "127.0.0.1:7340"
//! shared_secret = "..."        # optional
//! request_timeout_secs = 30
//!
//! [ocr]
//! provider = "textract"        # "textract" | "disabled"
//! region = "us-east-1"
//! endpoint_url = "http://localhost:4566"   # optional
//! timeout_secs = 30
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Bearer token required on `/search` and `/events` when set.
    #[serde(default)]
    pub shared_secret: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            shared_secret: None,
            request_timeout_secs: default_timeout_secs(),
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OcrConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Overrides the regional Textract endpoint (e.g. a local emulator).
    #[serde(default)]
    pub endpoint_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            region: default_region(),
            endpoint_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl OcrConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_bind() -> String {
    "127.0.0.1:7340".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_provider() -> String {
    "textract".to_string()
}
fn default_region() -> String {
    "us-east-1".to_string()
}

impl Config {
    /// A config with OCR disabled and the database at `db_path`.
    pub fn minimal(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db: DbConfig {
                path: db_path.into(),
            },
            server: ServerConfig::default(),
            ocr: OcrConfig {
                provider: "disabled".to_string(),
                ..OcrConfig::default()
            },
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.request_timeout_secs == 0 {
            anyhow::bail!("server.request_timeout_secs must be > 0");
        }
        if self.ocr.timeout_secs == 0 {
            anyhow::bail!("ocr.timeout_secs must be > 0");
        }
        match self.ocr.provider.as_str() {
            "disabled" => {}
            "textract" => {
                if self.ocr.region.trim().is_empty() {
                    anyhow::bail!("ocr.region must be set when provider is 'textract'");
                }
            }
            other => anyhow::bail!(
                "Unknown OCR provider: '{}'. Must be textract or disabled.",
                other
            ),
        }
        if let Some(secret) = &self.server.shared_secret {
            if secret.is_empty() {
                anyhow::bail!("server.shared_secret must not be empty when set");
            }
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_optional_sections() {
        let config = parse_config("[db]\npath = \"/tmp/p.sqlite\"\n").unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:7340");
        assert_eq!(config.server.request_timeout(), Duration::from_secs(30));
        assert!(config.server.shared_secret.is_none());
        assert_eq!(config.ocr.provider, "textract");
        assert_eq!(config.ocr.region, "us-east-1");
        assert!(config.ocr.is_enabled());
    }

    #[test]
    fn test_full_config() {
        let config = parse_config(
            r#"
[db]
path = "./data/pagegrep.sqlite"

[server]
bind = "0.0.0.0:8080"
shared_secret = "s3cret"
request_timeout_secs = 5

[ocr]
provider = "textract"
region = "eu-west-1"
endpoint_url = "http://localhost:4566"
timeout_secs = 10
"#,
        )
        .unwrap();
        assert_eq!(config.server.shared_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.ocr.endpoint_url.as_deref(), Some("http://localhost:4566"));
        assert_eq!(config.ocr.timeout_secs, 10);
    }

    #[test]
    fn test_rejects_unknown_provider() {
        let err = parse_config("[db]\npath = \"p\"\n[ocr]\nprovider = \"tesseract\"\n").unwrap_err();
        assert!(err.to_string().contains("Unknown OCR provider"));
    }

    #[test]
    fn test_rejects_zero_timeouts() {
        assert!(parse_config("[db]\npath = \"p\"\n[server]\nrequest_timeout_secs = 0\n").is_err());
        assert!(parse_config("[db]\npath = \"p\"\n[ocr]\ntimeout_secs = 0\n").is_err());
    }

    #[test]
    fn test_textract_needs_region() {
        assert!(parse_config("[db]\npath = \"p\"\n[ocr]\nregion = \"\"\n").is_err());
        assert!(parse_config("[db]\npath = \"p\"\n[ocr]\nprovider = \"disabled\"\nregion = \"\"\n").is_ok());
    }

    #[test]
    fn test_minimal_is_valid() {
        let config = Config::minimal("/tmp/x.sqlite");
        config.validate().unwrap();
        assert!(!config.ocr.is_enabled());
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/pagegrep.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
