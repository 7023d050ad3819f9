//! Error types for the form session core
use crate::types::ErrorMap;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("store backend failed: {0}")]
    Backend(#[from] sled::Error),
    #[error("stored value under '{0}' is not valid utf-8")]
    NotUtf8(String),
    #[error("failed to encode draft: {0}")]
    Encode(String),
}

#[derive(thiserror::Error, Debug)]
pub enum DraftError {
    #[error("unknown field '{0}'")]
    UnknownField(String),
    #[error("unknown sequence '{0}'")]
    UnknownSequence(String),
    #[error("unknown group '{0}'")]
    UnknownGroup(String),
    #[error("unknown facility '{0}'")]
    UnknownFacility(String),
    #[error("unknown attachment slot '{0}'")]
    UnknownSlot(String),
    #[error("'{field}' has no entry at index {index} (length {len})")]
    IndexOutOfRange {
        field: &'static str,
        index: usize,
        len: usize,
    },
    #[error("failed to encode draft: {0}")]
    Encode(String),
    #[error("failed to decode draft: {0}")]
    Decode(#[from] minicbor::decode::Error),
    #[error("draft blob is not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),
}

#[derive(thiserror::Error, Debug)]
pub enum AttachmentError {
    #[error("{slot} only accepts {expected} files, got '{content_type}'")]
    ContentType {
        slot: &'static str,
        expected: &'static str,
        content_type: String,
    },
    #[error("{slot} only accepts {allowed} files, got '{file_name}'")]
    FileType {
        slot: &'static str,
        allowed: String,
        file_name: String,
    },
    #[error("{slot} is limited to {limit} bytes, got {size}")]
    TooLarge {
        slot: &'static str,
        limit: usize,
        size: usize,
    },
    #[error("{0} is empty")]
    Empty(&'static str),
    #[error("failed to create preview: {0}")]
    Preview(#[from] std::io::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum EndpointError {
    #[error("submission rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("submission endpoint failed ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("submission could not be delivered: {0}")]
    Transport(String),
}

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("application has already been submitted")]
    AlreadySubmitted,
    #[error("application has not been submitted yet")]
    NotSubmitted,
    #[error("a submission is already in progress")]
    SubmissionInProgress,
    #[error("submission is only available on the final step (currently on step {0})")]
    NotOnFinalStep(u8),
    #[error("current step has {} validation error(s)", .0.len())]
    Invalid(ErrorMap),
    #[error(transparent)]
    Draft(#[from] DraftError),
    #[error(transparent)]
    Attachment(#[from] AttachmentError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Submission(#[from] EndpointError),
}

#[derive(thiserror::Error, Debug)]
pub enum LedgerError {
    #[error("no application with number '{0}'")]
    NotFound(String),
    #[error("unknown application status '{0}'")]
    UnknownStatus(String),
    #[error("ledger backend failed: {0}")]
    Backend(#[from] sled::Error),
    #[error("ledger record is corrupt: {0}")]
    Corrupt(#[from] minicbor::decode::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}
