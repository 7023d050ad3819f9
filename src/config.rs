//! Runtime configuration, read from TOML
//!
//! Every key is optional:
//!
//! ```toml
//! log_level = "info"
//! ledger_path = "data/ledger.db"
//!
//! [store]
//! draft = "msmeFormData"
//! submitted = "msmeFormSubmitted"
//! reference = "applicationNumber"
//!
//! [attachments]
//! signature_max_bytes = 2097152
//! document_max_bytes = 10485760
//! ```
use crate::attachment::AttachmentLimits;
use crate::error::ConfigError;
use crate::store::StoreKeys;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default tracing filter; `RUST_LOG` wins when set.
    pub log_level: String,
    pub ledger_path: PathBuf,
    pub store: StoreKeys,
    pub attachments: AttachmentConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AttachmentConfig {
    pub signature_max_bytes: usize,
    pub document_max_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            ledger_path: PathBuf::from("data/ledger.db"),
            store: StoreKeys::default(),
            attachments: AttachmentConfig::default(),
        }
    }
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        let limits = AttachmentLimits::default();
        Self {
            signature_max_bytes: limits.signature_max_bytes,
            document_max_bytes: limits.document_max_bytes,
        }
    }
}

impl Config {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn attachment_limits(&self) -> AttachmentLimits {
        AttachmentLimits {
            signature_max_bytes: self.attachments.signature_max_bytes,
            document_max_bytes: self.attachments.document_max_bytes,
        }
    }
}
