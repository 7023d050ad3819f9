//! Submission payload and the endpoint seam
use crate::attachment::{Attachment, AttachmentSlot};
use crate::draft::Draft;
use crate::error::{DraftError, EndpointError};

/// Name of the part that carries the structured block.
pub const FORM_DATA_PART: &str = "form_data";

/// Wire-ready form of a draft: attachments as named binary parts, every
/// other field in one CBOR block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionPayload {
    pub form_data: Vec<u8>,
    pub parts: Vec<(AttachmentSlot, Attachment)>,
}

impl SubmissionPayload {
    pub fn from_draft(draft: &Draft) -> Result<Self, DraftError> {
        Ok(Self {
            form_data: draft.to_cbor()?,
            parts: draft
                .attachments
                .iter()
                .map(|(slot, attachment)| (slot, attachment.clone()))
                .collect(),
        })
    }

    pub fn part(&self, slot: AttachmentSlot) -> Option<&Attachment> {
        self.parts
            .iter()
            .find(|(s, _)| *s == slot)
            .map(|(_, attachment)| attachment)
    }

    /// Digest of the structured block, used to detect tampering.
    pub fn digest(&self) -> String {
        sha256::digest(self.form_data.as_slice())
    }
}

/// What the endpoint hands back on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub application_number: String,
}

/// A remote write that finalises a draft.
pub trait SubmissionEndpoint {
    fn submit(&self, payload: &SubmissionPayload) -> Result<Receipt, EndpointError>;
}

impl<E: SubmissionEndpoint + ?Sized> SubmissionEndpoint for &E {
    fn submit(&self, payload: &SubmissionPayload) -> Result<Receipt, EndpointError> {
        (**self).submit(payload)
    }
}
