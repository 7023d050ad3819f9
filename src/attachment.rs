//! Attachment slots, acceptance rules and transient previews
use crate::error::{AttachmentError, DraftError};
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use tempfile::NamedTempFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttachmentSlot {
    ItrCertificate,
    PensionDocument,
    Signature,
}

impl AttachmentSlot {
    pub const ALL: [AttachmentSlot; 3] = [
        AttachmentSlot::ItrCertificate,
        AttachmentSlot::PensionDocument,
        AttachmentSlot::Signature,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AttachmentSlot::ItrCertificate => "itr_certificate",
            AttachmentSlot::PensionDocument => "pension_document",
            AttachmentSlot::Signature => "signature",
        }
    }
}

impl FromStr for AttachmentSlot {
    type Err = DraftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|slot| slot.as_str() == s)
            .ok_or_else(|| DraftError::UnknownSlot(s.to_string()))
    }
}

/// An uploaded file held in memory until submission.
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct Attachment {
    #[n(0)]
    pub file_name: String,
    #[n(1)]
    pub content_type: String,
    #[n(2)]
    #[cbor(with = "minicbor::bytes")]
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }
}

/// Size and content rules applied when a file is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentLimits {
    pub signature_max_bytes: usize,
    pub document_max_bytes: usize,
}

impl Default for AttachmentLimits {
    fn default() -> Self {
        Self {
            signature_max_bytes: 2 * 1024 * 1024,
            document_max_bytes: 10 * 1024 * 1024,
        }
    }
}

/// File types accepted for the ITR certificate and pension document.
pub const DOCUMENT_EXTENSIONS: [&str; 4] = [".pdf", ".jpg", ".jpeg", ".png"];

impl AttachmentLimits {
    pub fn check(&self, slot: AttachmentSlot, attachment: &Attachment) -> Result<(), AttachmentError> {
        if attachment.bytes.is_empty() {
            return Err(AttachmentError::Empty(slot.as_str()));
        }
        let limit = match slot {
            AttachmentSlot::Signature => {
                if !attachment.content_type.starts_with("image/") {
                    return Err(AttachmentError::ContentType {
                        slot: slot.as_str(),
                        expected: "image/*",
                        content_type: attachment.content_type.clone(),
                    });
                }
                self.signature_max_bytes
            }
            AttachmentSlot::ItrCertificate | AttachmentSlot::PensionDocument => {
                let extension = extension_for(attachment).to_ascii_lowercase();
                if !DOCUMENT_EXTENSIONS.contains(&extension.as_str()) {
                    return Err(AttachmentError::FileType {
                        slot: slot.as_str(),
                        allowed: DOCUMENT_EXTENSIONS.join(", "),
                        file_name: attachment.file_name.clone(),
                    });
                }
                self.document_max_bytes
            }
        };
        if attachment.bytes.len() > limit {
            return Err(AttachmentError::TooLarge {
                slot: slot.as_str(),
                limit,
                size: attachment.bytes.len(),
            });
        }
        Ok(())
    }
}

/// The three slots of a draft.
///
/// Never written into the persisted draft blob: files are encoded as `null`
/// and come back empty after a reload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attachments {
    itr_certificate: Option<Attachment>,
    pension_document: Option<Attachment>,
    signature: Option<Attachment>,
}

impl Attachments {
    pub fn get(&self, slot: AttachmentSlot) -> Option<&Attachment> {
        self.slot(slot).as_ref()
    }

    /// Puts `attachment` into `slot`, handing back what was there before.
    pub fn replace(&mut self, slot: AttachmentSlot, attachment: Option<Attachment>) -> Option<Attachment> {
        std::mem::replace(self.slot_mut(slot), attachment)
    }

    pub fn iter(&self) -> impl Iterator<Item = (AttachmentSlot, &Attachment)> {
        AttachmentSlot::ALL
            .into_iter()
            .filter_map(|slot| self.get(slot).map(|a| (slot, a)))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    fn slot(&self, slot: AttachmentSlot) -> &Option<Attachment> {
        match slot {
            AttachmentSlot::ItrCertificate => &self.itr_certificate,
            AttachmentSlot::PensionDocument => &self.pension_document,
            AttachmentSlot::Signature => &self.signature,
        }
    }

    fn slot_mut(&mut self, slot: AttachmentSlot) -> &mut Option<Attachment> {
        match slot {
            AttachmentSlot::ItrCertificate => &mut self.itr_certificate,
            AttachmentSlot::PensionDocument => &mut self.pension_document,
            AttachmentSlot::Signature => &mut self.signature,
        }
    }
}

impl<C> minicbor::Encode<C> for Attachments {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.null()?.ok()
    }
}

impl<'b, C> minicbor::Decode<'b, C> for Attachments {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        d.skip()?;
        Ok(Self::default())
    }
}

/// A temporary file holding an attachment's bytes, for hosts that need a
/// path to display it. The file is removed when the preview is dropped.
#[derive(Debug)]
pub struct Preview {
    slot: AttachmentSlot,
    file: NamedTempFile,
}

impl Preview {
    pub fn create(slot: AttachmentSlot, attachment: &Attachment) -> Result<Self, AttachmentError> {
        let mut file = tempfile::Builder::new()
            .prefix(slot.as_str())
            .suffix(&extension_for(attachment))
            .tempfile()?;
        file.write_all(&attachment.bytes)?;
        file.flush()?;
        tracing::debug!(slot = slot.as_str(), path = %file.path().display(), "preview created");
        Ok(Self { slot, file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

impl Drop for Preview {
    fn drop(&mut self) {
        tracing::debug!(slot = self.slot.as_str(), "preview released");
    }
}

fn extension_for(attachment: &Attachment) -> String {
    Path::new(&attachment.file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(size: usize) -> Attachment {
        Attachment::new("sign.png", "image/png", vec![7; size])
    }

    #[test]
    fn signature_must_be_an_image() {
        let limits = AttachmentLimits::default();
        let pdf = Attachment::new("sign.pdf", "application/pdf", vec![1, 2, 3]);

        assert!(matches!(
            limits.check(AttachmentSlot::Signature, &pdf),
            Err(AttachmentError::ContentType { .. })
        ));
        assert!(limits.check(AttachmentSlot::PensionDocument, &pdf).is_ok());
        assert!(limits.check(AttachmentSlot::Signature, &png(10)).is_ok());
    }

    #[test]
    fn documents_take_pdf_and_images_only() {
        let limits = AttachmentLimits::default();
        for name in ["itr.pdf", "itr.JPG", "scan.jpeg", "scan.png"] {
            let file = Attachment::new(name, "application/octet-stream", vec![1]);
            assert!(limits.check(AttachmentSlot::ItrCertificate, &file).is_ok(), "{name}");
        }

        for name in ["itr.docx", "run.exe", "no_extension"] {
            let file = Attachment::new(name, "application/pdf", vec![1]);
            assert!(matches!(
                limits.check(AttachmentSlot::PensionDocument, &file),
                Err(AttachmentError::FileType { slot: "pension_document", .. })
            ));
        }
    }

    #[test]
    fn signature_size_is_capped() {
        let limits = AttachmentLimits {
            signature_max_bytes: 16,
            ..Default::default()
        };

        assert!(limits.check(AttachmentSlot::Signature, &png(16)).is_ok());
        assert!(matches!(
            limits.check(AttachmentSlot::Signature, &png(17)),
            Err(AttachmentError::TooLarge { limit: 16, size: 17, .. })
        ));
        assert!(matches!(
            limits.check(AttachmentSlot::Signature, &png(0)),
            Err(AttachmentError::Empty("signature"))
        ));
    }

    #[test]
    fn slots_are_not_persisted() {
        let mut attachments = Attachments::default();
        attachments.replace(AttachmentSlot::Signature, Some(png(4)));

        let encoded = minicbor::to_vec(&attachments).unwrap();
        let decoded: Attachments = minicbor::decode(&encoded).unwrap();

        assert!(decoded.is_empty());
    }

    #[test]
    fn preview_file_lives_as_long_as_the_handle() {
        let preview = Preview::create(AttachmentSlot::Signature, &png(32)).unwrap();
        let path = preview.path().to_path_buf();

        assert_eq!(std::fs::read(&path).unwrap().len(), 32);
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("png"));

        drop(preview);
        assert!(!path.exists());
    }

    #[test]
    fn slot_names_round_trip() {
        for slot in AttachmentSlot::ALL {
            assert_eq!(slot.as_str().parse::<AttachmentSlot>().unwrap(), slot);
        }
        assert!("photo".parse::<AttachmentSlot>().is_err());
    }
}
