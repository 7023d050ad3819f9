//! Submission ledger: a sled backed endpoint that keeps every accepted
//! application for the admin review screens
use crate::attachment::{Attachment, AttachmentSlot};
use crate::config::Config;
use crate::draft::{Draft, Field};
use crate::error::{EndpointError, LedgerError};
use crate::step::{Step, validate};
use crate::submission::{Receipt, SubmissionEndpoint, SubmissionPayload};
use crate::types::TimeStamp;
use crate::utils::new_application_number;
use anyhow::Context;
use chrono::Utc;
use sled::Batch;
use std::str::FromStr;
use std::sync::Arc;

const RECORD_PREFIX: &str = "app/";
const BLOB_PREFIX: &str = "blob/";

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Status {
    #[n(0)]
    Pending,
    #[n(1)]
    Approved,
    #[n(2)]
    Rejected,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Approved => "approved",
            Status::Rejected => "rejected",
        }
    }
}

impl FromStr for Status {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Status::Pending),
            "approved" => Ok(Status::Approved),
            "rejected" => Ok(Status::Rejected),
            _ => Err(LedgerError::UnknownStatus(s.to_string())),
        }
    }
}

/// Metadata of a stored file; the bytes live under their hash.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct StoredAttachment {
    #[n(0)]
    pub slot: String,
    #[n(1)]
    pub file_name: String,
    #[n(2)]
    pub content_type: String,
    #[n(3)]
    pub blob_hash: String,
    #[n(4)]
    pub size: u64,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct ApplicationRecord {
    #[n(0)]
    pub application_number: String,
    #[n(1)]
    pub status: Status,
    #[n(2)]
    pub submitted_at: TimeStamp<Utc>,
    #[n(3)]
    pub form_hash: String, // sha256 of form_data
    #[n(4)]
    #[cbor(with = "minicbor::bytes")]
    pub form_data: Vec<u8>,
    #[n(5)]
    pub attachments: Vec<StoredAttachment>,
    #[n(6)]
    pub unit_name: String,
    #[n(7)]
    pub mobile: String,
}

impl ApplicationRecord {
    pub fn draft(&self) -> Result<Draft, LedgerError> {
        Ok(minicbor::decode(&self.form_data)?)
    }

    pub fn summary(&self) -> ApplicationSummary {
        ApplicationSummary {
            application_number: self.application_number.clone(),
            unit_name: self.unit_name.clone(),
            mobile: self.mobile.clone(),
            status: self.status,
            submitted_at: self.submitted_at.clone(),
        }
    }
}

/// One row of the admin table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationSummary {
    pub application_number: String,
    pub unit_name: String,
    pub mobile: String,
    pub status: Status,
    pub submitted_at: TimeStamp<Utc>,
}

pub struct SubmissionLedger {
    instance: Arc<sled::Db>,
}

fn record_key(application_number: &str) -> String {
    format!("{RECORD_PREFIX}{application_number}")
}

fn blob_key(hash: &str) -> String {
    format!("{BLOB_PREFIX}{hash}")
}

fn rejected(message: impl Into<String>) -> EndpointError {
    EndpointError::Rejected {
        status: 400,
        message: message.into(),
    }
}

fn server_error(e: impl std::fmt::Display) -> EndpointError {
    EndpointError::Server {
        status: 500,
        message: e.to_string(),
    }
}

impl SubmissionLedger {
    pub fn new(instance: Arc<sled::Db>) -> Self {
        Self { instance }
    }

    /// Opens, or creates, the database at `config.ledger_path`.
    pub fn open(config: &Config) -> anyhow::Result<Self> {
        let db = sled::open(&config.ledger_path)
            .with_context(|| format!("opening ledger at {}", config.ledger_path.display()))?;
        Ok(Self::new(Arc::new(db)))
    }

    /// Validates and stores a submission, returning its application number.
    pub fn accept(&self, payload: &SubmissionPayload) -> Result<Receipt, EndpointError> {
        let draft = Draft::from_cbor(&payload.form_data)
            .map_err(|e| rejected(format!("form data is malformed: {e}")))?;

        for step in [Step::FIRST, Step::FIRST.next()] {
            if let Some((field, message)) = validate(&draft, step).into_iter().next() {
                return Err(rejected(format!("{field}: {message}")));
            }
        }
        if payload.part(AttachmentSlot::Signature).is_none() {
            return Err(rejected("signature: missing signature"));
        }

        let application_number = new_application_number().map_err(server_error)?;
        let mut batch = Batch::default();
        let mut attachments = Vec::with_capacity(payload.parts.len());
        for (slot, attachment) in &payload.parts {
            let blob_hash = sha256::digest(attachment.bytes.as_slice());
            batch.insert(blob_key(&blob_hash).as_bytes(), attachment.bytes.as_slice());
            attachments.push(StoredAttachment {
                slot: slot.as_str().to_string(),
                file_name: attachment.file_name.clone(),
                content_type: attachment.content_type.clone(),
                blob_hash,
                size: attachment.bytes.len() as u64,
            });
        }

        let record = ApplicationRecord {
            application_number: application_number.clone(),
            status: Status::Pending,
            submitted_at: TimeStamp::now(),
            form_hash: payload.digest(),
            form_data: payload.form_data.clone(),
            attachments,
            unit_name: draft.field(Field::UnitName).trim().to_string(),
            mobile: draft.field(Field::Mobile).to_string(),
        };
        let encoded = minicbor::to_vec(&record).map_err(server_error)?;
        batch.insert(record_key(&application_number).as_bytes(), encoded);
        self.instance.apply_batch(batch).map_err(server_error)?;
        self.instance.flush().map_err(server_error)?;

        tracing::info!(%application_number, parts = payload.parts.len(), "application stored");
        Ok(Receipt { application_number })
    }

    pub fn get(&self, application_number: &str) -> anyhow::Result<ApplicationRecord> {
        let bytes = self
            .instance
            .get(record_key(application_number).as_bytes())?
            .ok_or_else(|| LedgerError::NotFound(application_number.to_string()))?;
        let record: ApplicationRecord =
            minicbor::decode(&bytes).map_err(LedgerError::from)?;

        // the block must still match the digest taken at submission
        if sha256::digest(record.form_data.as_slice()) != record.form_hash {
            anyhow::bail!("form data of {application_number} does not match its digest");
        }
        Ok(record)
    }

    /// Every stored application, in key order.
    pub fn list(&self) -> anyhow::Result<Vec<ApplicationSummary>> {
        let mut rows = Vec::new();
        for entry in self.instance.scan_prefix(RECORD_PREFIX.as_bytes()) {
            let (_, bytes) = entry?;
            let record: ApplicationRecord =
                minicbor::decode(&bytes).map_err(LedgerError::from)?;
            rows.push(record.summary());
        }
        Ok(rows)
    }

    pub fn attachment(
        &self,
        application_number: &str,
        slot: AttachmentSlot,
    ) -> anyhow::Result<Option<Attachment>> {
        let record = self.get(application_number)?;
        let Some(meta) = record
            .attachments
            .iter()
            .find(|a| a.slot == slot.as_str())
        else {
            return Ok(None);
        };
        let bytes = self
            .instance
            .get(blob_key(&meta.blob_hash).as_bytes())?
            .ok_or_else(|| anyhow::anyhow!("blob {} is missing", meta.blob_hash))?;

        Ok(Some(Attachment::new(
            meta.file_name.clone(),
            meta.content_type.clone(),
            bytes.to_vec(),
        )))
    }

    pub fn set_status(&self, application_number: &str, status: Status) -> anyhow::Result<ApplicationRecord> {
        let mut record = self.get(application_number)?;
        record.status = status;
        self.instance.insert(
            record_key(application_number).as_bytes(),
            minicbor::to_vec(&record)?,
        )?;
        self.instance.flush()?;
        tracing::info!(%application_number, status = status.as_str(), "status updated");
        Ok(record)
    }

    /// Removes the record and its files.
    pub fn delete(&self, application_number: &str) -> anyhow::Result<()> {
        let record = self.get(application_number)?;
        let mut batch = Batch::default();
        for attachment in &record.attachments {
            // identical files are stored once, keep blobs other records use
            if !self.blob_shared(&attachment.blob_hash, application_number)? {
                batch.remove(blob_key(&attachment.blob_hash).as_bytes());
            }
        }
        batch.remove(record_key(application_number).as_bytes());
        self.instance.apply_batch(batch)?;
        self.instance.flush()?;
        tracing::info!(%application_number, "application deleted");
        Ok(())
    }

    fn blob_shared(&self, blob_hash: &str, except: &str) -> anyhow::Result<bool> {
        for entry in self.instance.scan_prefix(RECORD_PREFIX.as_bytes()) {
            let (_, bytes) = entry?;
            let record: ApplicationRecord =
                minicbor::decode(&bytes).map_err(LedgerError::from)?;
            if record.application_number != except
                && record.attachments.iter().any(|a| a.blob_hash == blob_hash)
            {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl SubmissionEndpoint for SubmissionLedger {
    fn submit(&self, payload: &SubmissionPayload) -> Result<Receipt, EndpointError> {
        self.accept(payload)
    }
}
