#![allow(unused_imports)]

use anyhow::Context;
use msme_award::{
    attachment::{Attachment, AttachmentSlot},
    config::Config,
    draft::{Draft, Field, Sequence},
    error::{EndpointError, LedgerError, SessionError},
    ledger::{Status, SubmissionLedger},
    review::{StatusFilter, TableQuery},
    session::{Completion, FormSession, Notice, Phase},
    step::Step,
    store::SledStore,
    submission::{Receipt, SubmissionEndpoint, SubmissionPayload},
};
use sled::open;
use std::sync::Arc;

use tempfile::tempdir; // Use for test db cleanup.

// Sled holds a file lock per database, so every test opens its own under a
// temp dir that is removed on drop.
fn temp_db(dir: &tempfile::TempDir, name: &str) -> anyhow::Result<Arc<sled::Db>> {
    let db = open(dir.path().join(name))?;
    db.clear()?;
    Ok(Arc::new(db))
}

fn signature() -> Attachment {
    Attachment::new("signature.png", "image/png", vec![0x89, b'P', b'N', b'G', 1, 2, 3])
}

/// Fills the required answers and walks the session to the final step.
fn complete_form(session: &mut FormSession<SledStore>, unit_name: &str, mobile: &str) -> anyhow::Result<()> {
    session.set_field(Field::UnitName, unit_name)?;
    session.set_field(Field::Mobile, mobile)?;
    session.advance().context("step 1 should pass")?;
    session.set_field(Field::UdyamNumber, "UDYAM-MP-23-0012345")?;
    while !session.step().is_some_and(Step::is_last) {
        session.advance()?;
    }
    session.set_attachment(AttachmentSlot::Signature, signature())?;
    Ok(())
}

struct Unavailable;

impl SubmissionEndpoint for Unavailable {
    fn submit(&self, _: &SubmissionPayload) -> Result<Receipt, EndpointError> {
        Err(EndpointError::Server {
            status: 503,
            message: "service unavailable".into(),
        })
    }
}

#[test]
fn submit_through_ledger_and_review() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let browser = temp_db(&temp_dir, "browser.db")?;
    let ledger = SubmissionLedger::new(temp_db(&temp_dir, "ledger.db")?);

    let mut session = FormSession::open(SledStore::new(Arc::clone(&browser)), &Config::default());
    complete_form(&mut session, "Narmada Agro Products", "9876543210")?;
    session.set_field(Field::PermMale, "12")?;

    let receipt = match session.submit(&ledger).context("submission failed")? {
        Completion::Submitted(receipt) => receipt,
        Completion::Ignored => anyhow::bail!("own ticket was ignored"),
    };

    assert!(receipt.application_number.starts_with("app_1"));
    assert_eq!(session.phase(), Phase::Submitted);
    assert_eq!(session.reference_id().as_deref(), Some(receipt.application_number.as_str()));
    assert_eq!(
        session.notice(),
        Some(&Notice::Submitted {
            application_number: receipt.application_number.clone()
        })
    );

    // the ledger kept the structured block and the signature
    let record = ledger.get(&receipt.application_number)?;
    assert_eq!(record.status, Status::Pending);
    assert_eq!(record.unit_name, "Narmada Agro Products");
    let stored = record.draft()?;
    assert_eq!(stored.field(Field::PermMale), "12");
    assert!(stored.attachments.is_empty());

    let file = ledger
        .attachment(&receipt.application_number, AttachmentSlot::Signature)?
        .context("signature missing from ledger")?;
    assert_eq!(file, signature());
    assert!(ledger
        .attachment(&receipt.application_number, AttachmentSlot::PensionDocument)?
        .is_none());

    // the admin approves and filters
    ledger.set_status(&receipt.application_number, Status::Approved)?;
    let rows = ledger.list()?;
    let mut query = TableQuery::new();
    query.set_status(StatusFilter::Only(Status::Approved));
    let page = query.apply(&rows);
    assert_eq!(page.filtered, 1);
    assert_eq!(page.rows[0].application_number, receipt.application_number);

    query.set_status(StatusFilter::Only(Status::Pending));
    assert_eq!(query.apply(&rows).filtered, 0);

    Ok(())
}

#[test]
fn reload_after_submission_shows_confirmation() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let browser = temp_db(&temp_dir, "browser.db")?;
    let ledger = SubmissionLedger::new(temp_db(&temp_dir, "ledger.db")?);

    let mut session = FormSession::open(SledStore::new(Arc::clone(&browser)), &Config::default());
    complete_form(&mut session, "Malwa Handlooms", "9123456780")?;
    session.submit(&ledger)?;
    let number = session.reference_id().context("reference id not stored")?;
    drop(session);

    let reopened = FormSession::open(SledStore::new(Arc::clone(&browser)), &Config::default());
    assert_eq!(reopened.phase(), Phase::Submitted);
    assert_eq!(reopened.reference_id(), Some(number));
    assert_eq!(reopened.draft(), &Draft::default());

    Ok(())
}

#[test]
fn draft_survives_restart_without_files() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let browser = temp_db(&temp_dir, "browser.db")?;

    let mut session = FormSession::open(SledStore::new(Arc::clone(&browser)), &Config::default());
    session.set_field(Field::UnitName, "Chambal Ceramics")?;
    session.append_sequence_item(Sequence::Proprietors)?;
    session.set_sequence_item_field(Sequence::Proprietors, 1, "share", "40")?;
    session.set_attachment(AttachmentSlot::Signature, signature())?;
    let expected = session.draft().without_attachments();
    drop(session);

    let reopened = FormSession::open(SledStore::new(Arc::clone(&browser)), &Config::default());
    assert_eq!(reopened.step(), Some(Step::FIRST));
    assert_eq!(reopened.draft(), &expected);
    assert_eq!(reopened.draft().proprietors[1].share, "40");
    assert!(reopened.draft().attachment(AttachmentSlot::Signature).is_none());

    Ok(())
}

#[test]
fn failed_submission_can_be_retried() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let browser = temp_db(&temp_dir, "browser.db")?;
    let ledger = SubmissionLedger::new(temp_db(&temp_dir, "ledger.db")?);

    let mut session = FormSession::open(SledStore::new(Arc::clone(&browser)), &Config::default());
    complete_form(&mut session, "Betwa Engineering", "8000000001")?;
    let before = session.draft().clone();

    let err = session.submit(&Unavailable).unwrap_err();
    assert!(matches!(err, SessionError::Submission(EndpointError::Server { status: 503, .. })));
    assert_eq!(session.step(), Some(Step::LAST));
    assert_eq!(session.draft(), &before);
    assert!(!session.is_submitting());
    assert!(matches!(session.notice(), Some(Notice::SubmissionFailed { .. })));

    session.dismiss_notice();
    session.submit(&ledger).context("retry failed")?;
    assert_eq!(session.phase(), Phase::Submitted);
    assert_eq!(ledger.list()?.len(), 1);

    Ok(())
}

#[test]
fn start_new_session_clears_everything() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let browser = temp_db(&temp_dir, "browser.db")?;
    let ledger = SubmissionLedger::new(temp_db(&temp_dir, "ledger.db")?);

    let mut session = FormSession::open(SledStore::new(Arc::clone(&browser)), &Config::default());
    complete_form(&mut session, "Tapti Agro", "7000000002")?;
    session.submit(&ledger)?;

    session.start_new_session()?;
    assert_eq!(session.step(), Some(Step::FIRST));
    assert_eq!(session.draft(), &Draft::default());
    assert!(session.reference_id().is_none());
    assert!(session.notice().is_none());
    drop(session);

    let reopened = FormSession::open(SledStore::new(Arc::clone(&browser)), &Config::default());
    assert_eq!(reopened.step(), Some(Step::FIRST));

    Ok(())
}

#[test]
fn stale_ticket_is_ignored() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let first = temp_db(&temp_dir, "first.db")?;
    let second = temp_db(&temp_dir, "second.db")?;

    let mut a = FormSession::open(SledStore::new(first), &Config::default());
    let mut b = FormSession::open(SledStore::new(second), &Config::default());
    complete_form(&mut a, "Ken Textiles", "9000000003")?;

    let ticket = a.begin_submission()?;
    assert!(matches!(a.begin_submission(), Err(SessionError::SubmissionInProgress)));

    let outcome = Ok(Receipt {
        application_number: "app_1stale".into(),
    });
    assert_eq!(b.complete_submission(ticket, outcome)?, Completion::Ignored);
    assert_eq!(b.phase(), Phase::Editing { step: Step::FIRST });
    assert!(b.reference_id().is_none());

    Ok(())
}

#[test]
fn ledger_rejects_incomplete_payloads() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let ledger = SubmissionLedger::new(temp_db(&temp_dir, "ledger.db")?);

    let garbage = SubmissionPayload {
        form_data: vec![0xff, 0x00, 0x13],
        parts: Vec::new(),
    };
    assert!(matches!(
        ledger.accept(&garbage),
        Err(EndpointError::Rejected { status: 400, .. })
    ));

    let mut draft = Draft::default();
    draft.set_field(Field::UnitName, "Sone Minerals");
    draft.set_field(Field::Mobile, "9876543210");
    draft.set_field(Field::UdyamNumber, "UDYAM-MP-01-0000001");
    let unsigned = SubmissionPayload::from_draft(&draft)?;
    let err = ledger.accept(&unsigned).unwrap_err();
    assert!(err.to_string().contains("signature"));

    assert!(ledger.list()?.is_empty());
    Ok(())
}

#[test]
fn delete_removes_record_and_files() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let browser = temp_db(&temp_dir, "browser.db")?;
    let ledger = SubmissionLedger::new(temp_db(&temp_dir, "ledger.db")?);

    let mut session = FormSession::open(SledStore::new(browser), &Config::default());
    complete_form(&mut session, "Mahi Plastics", "6000000004")?;
    session.submit(&ledger)?;
    let number = session.reference_id().context("reference id not stored")?;

    ledger.delete(&number)?;
    assert!(ledger.list()?.is_empty());

    let err = ledger.get(&number).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LedgerError>(),
        Some(LedgerError::NotFound(n)) if *n == number
    ));

    Ok(())
}

#[test]
fn previews_are_released_on_replace() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let browser = temp_db(&temp_dir, "browser.db")?;

    let mut session = FormSession::open(SledStore::new(browser), &Config::default());
    session.set_attachment(AttachmentSlot::Signature, signature())?;
    let first = session
        .preview(AttachmentSlot::Signature)?
        .context("no preview")?
        .to_path_buf();
    assert_eq!(std::fs::read(&first)?, signature().bytes);

    let replacement = Attachment::new("new.jpg", "image/jpeg", vec![0xff, 0xd8, 0xff]);
    session.set_attachment(AttachmentSlot::Signature, replacement)?;
    assert!(!first.exists());
    assert!(!session.has_preview(AttachmentSlot::Signature));

    session.clear_attachment(AttachmentSlot::Signature)?;
    assert!(session.preview(AttachmentSlot::Signature)?.is_none());

    Ok(())
}
