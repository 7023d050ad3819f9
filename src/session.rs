//! Form session: step navigation, mutators and the submission lifecycle
//!
//! ```text
//! EDITING(1..N-1) --advance[valid]--> EDITING(step+1)
//! EDITING(N)      --submit[ok]------> SUBMITTED
//! EDITING(any)    --retreat---------> EDITING(step-1)
//! SUBMITTED       --start_new_session--> EDITING(1)
//! ```
use crate::attachment::{Attachment, AttachmentLimits, AttachmentSlot, Preview};
use crate::config::Config;
use crate::draft::{Draft, Facility, Field, NestedGroup, Sequence, Triplet};
use crate::error::{EndpointError, SessionError};
use crate::step::{Step, validate};
use crate::store::{DraftStore, KeyValueStore, StoreKeys};
use crate::submission::{Receipt, SubmissionEndpoint, SubmissionPayload};
use crate::types::ErrorMap;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid7::uuid7;

pub const LEAVE_WARNING: &str =
    "Are you sure you want to leave? Your form data will be saved but not submitted.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Editing { step: Step },
    Submitted,
}

/// Dismissible message for the applicant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Submitted { application_number: String },
    SubmissionFailed { reason: String },
}

/// An outstanding submission. Only the session that issued it can complete it.
///
/// Dropping the ticket, completed or not, lets its session submit again.
#[derive(Debug)]
#[must_use = "a submission stays in progress until its ticket is completed or dropped"]
pub struct SubmissionTicket {
    session_id: String,
    payload: SubmissionPayload,
    in_flight: Arc<AtomicBool>,
}

impl SubmissionTicket {
    pub fn payload(&self) -> &SubmissionPayload {
        &self.payload
    }
}

impl Drop for SubmissionTicket {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Submitted(Receipt),
    /// The ticket belonged to another session instance, nothing changed.
    Ignored,
}

pub struct FormSession<S> {
    id: String,
    store: DraftStore<S>,
    limits: AttachmentLimits,
    draft: Draft,
    phase: Phase,
    errors: ErrorMap,
    submitting: Arc<AtomicBool>,
    notice: Option<Notice>,
    previews: HashMap<AttachmentSlot, Preview>,
}

impl<S: KeyValueStore> FormSession<S> {
    pub fn open(store: S, config: &Config) -> Self {
        Self::new(store, config.store.clone(), config.attachment_limits())
    }

    /// Restores the draft from `store`, or shows the confirmation view when
    /// the store says the application was already submitted.
    pub fn new(store: S, keys: StoreKeys, limits: AttachmentLimits) -> Self {
        let store = DraftStore::new(store, keys);
        let (draft, phase) = if store.is_submitted() {
            (Draft::default(), Phase::Submitted)
        } else {
            (store.load(), Phase::Editing { step: Step::FIRST })
        };
        let id = uuid7().to_string();
        tracing::info!(session = %id, ?phase, "form session opened");

        Self {
            id,
            store,
            limits,
            draft,
            phase,
            errors: ErrorMap::new(),
            submitting: Arc::new(AtomicBool::new(false)),
            notice: None,
            previews: HashMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current step while editing.
    pub fn step(&self) -> Option<Step> {
        match self.phase {
            Phase::Editing { step } => Some(step),
            Phase::Submitted => None,
        }
    }

    pub fn is_submitted(&self) -> bool {
        self.phase == Phase::Submitted
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }

    pub fn errors(&self) -> &ErrorMap {
        &self.errors
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Application number shown on the confirmation view.
    pub fn reference_id(&self) -> Option<String> {
        match self.phase {
            Phase::Submitted => self.store.reference_id(),
            Phase::Editing { .. } => None,
        }
    }

    pub fn progress_percent(&self) -> u8 {
        self.step().map_or(100, Step::progress_percent)
    }

    /// Warning to show before the applicant leaves the final step unsubmitted.
    pub fn leave_warning(&self) -> Option<&'static str> {
        match self.phase {
            Phase::Editing { step } if step.is_last() => Some(LEAVE_WARNING),
            _ => None,
        }
    }

    fn editing_step(&self) -> Result<Step, SessionError> {
        match self.phase {
            Phase::Editing { step } => Ok(step),
            Phase::Submitted => Err(SessionError::AlreadySubmitted),
        }
    }

    fn move_to(&mut self, step: Step) -> Result<Step, SessionError> {
        let from = self.editing_step()?;
        if step.is_last() && from != step {
            // a flag left over from an interrupted run must not skip the form
            self.store.clear_submitted_flag()?;
        }
        self.phase = Phase::Editing { step };
        tracing::debug!(session = %self.id, from = from.number(), to = step.number(), "step changed");
        Ok(step)
    }

    /// Validates the current step and moves forward on success.
    pub fn advance(&mut self) -> Result<Step, SessionError> {
        let step = self.editing_step()?;
        let errors = validate(&self.draft, step);
        if !errors.is_empty() {
            tracing::debug!(session = %self.id, step = step.number(), errors = errors.len(), "step blocked");
            self.errors = errors.clone();
            return Err(SessionError::Invalid(errors));
        }
        self.errors.clear();
        self.move_to(step.next())
    }

    /// Moves back one step. Never validates.
    pub fn retreat(&mut self) -> Result<Step, SessionError> {
        let step = self.editing_step()?;
        self.errors.clear();
        self.move_to(step.prev())
    }

    fn persist(&self) -> Result<(), SessionError> {
        Ok(self.store.save(&self.draft)?)
    }

    pub fn set_field(&mut self, field: Field, value: &str) -> Result<(), SessionError> {
        self.editing_step()?;
        self.draft.set_field(field, value);
        self.persist()
    }

    pub fn set_field_by_name(&mut self, name: &str, value: &str) -> Result<(), SessionError> {
        let field = name.parse::<Field>()?;
        self.set_field(field, value)
    }

    pub fn set_nested_field(
        &mut self,
        group: NestedGroup,
        field: &str,
        value: &str,
    ) -> Result<(), SessionError> {
        self.editing_step()?;
        self.draft.set_nested_field(group, field, value)?;
        self.persist()
    }

    pub fn set_sequence_item_field(
        &mut self,
        sequence: Sequence,
        index: usize,
        field: &str,
        value: &str,
    ) -> Result<(), SessionError> {
        self.editing_step()?;
        self.draft
            .set_sequence_item_field(sequence, index, field, value)?;
        self.persist()
    }

    pub fn set_triplet_item_field(
        &mut self,
        triplet: Triplet,
        index: usize,
        field: &str,
        value: &str,
    ) -> Result<(), SessionError> {
        self.editing_step()?;
        self.draft
            .set_triplet_item_field(triplet, index, field, value)?;
        self.persist()
    }

    /// Appends an empty record, returning its index.
    pub fn append_sequence_item(&mut self, sequence: Sequence) -> Result<usize, SessionError> {
        self.editing_step()?;
        let index = self.draft.append_sequence_item(sequence);
        self.persist()?;
        Ok(index)
    }

    /// Removes a record; `Ok(false)` when `index` is the pinned first record.
    pub fn remove_sequence_item(&mut self, sequence: Sequence, index: usize) -> Result<bool, SessionError> {
        self.editing_step()?;
        let removed = self.draft.remove_sequence_item(sequence, index)?;
        self.persist()?;
        Ok(removed)
    }

    pub fn toggle_facility(&mut self, facility: Facility) -> Result<bool, SessionError> {
        self.editing_step()?;
        let on = self.draft.toggle_facility(facility);
        self.persist()?;
        Ok(on)
    }

    /// Attaches a file, replacing and releasing whatever the slot held.
    pub fn set_attachment(&mut self, slot: AttachmentSlot, attachment: Attachment) -> Result<(), SessionError> {
        self.editing_step()?;
        self.limits.check(slot, &attachment)?;
        self.previews.remove(&slot);
        self.draft.attachments.replace(slot, Some(attachment));
        self.persist()
    }

    pub fn clear_attachment(&mut self, slot: AttachmentSlot) -> Result<(), SessionError> {
        self.editing_step()?;
        self.previews.remove(&slot);
        self.draft.attachments.replace(slot, None);
        self.persist()
    }

    /// Path to a temporary copy of the attachment in `slot`, created on first
    /// request and kept until the attachment is replaced or cleared.
    pub fn preview(&mut self, slot: AttachmentSlot) -> Result<Option<&Path>, SessionError> {
        let Some(attachment) = self.draft.attachments.get(slot) else {
            return Ok(None);
        };
        if !self.previews.contains_key(&slot) {
            let preview = Preview::create(slot, attachment)?;
            self.previews.insert(slot, preview);
        }
        Ok(self.previews.get(&slot).map(Preview::path))
    }

    pub fn has_preview(&self, slot: AttachmentSlot) -> bool {
        self.previews.contains_key(&slot)
    }

    /// Checks the final step and hands out the payload to send. While the
    /// ticket is outstanding further submissions are refused.
    pub fn begin_submission(&mut self) -> Result<SubmissionTicket, SessionError> {
        let step = self.editing_step()?;
        if self.is_submitting() {
            return Err(SessionError::SubmissionInProgress);
        }
        if !step.is_last() {
            return Err(SessionError::NotOnFinalStep(step.number()));
        }
        let errors = validate(&self.draft, step);
        if !errors.is_empty() {
            self.errors = errors.clone();
            return Err(SessionError::Invalid(errors));
        }
        self.errors.clear();

        let payload = SubmissionPayload::from_draft(&self.draft)?;
        self.submitting.store(true, Ordering::Release);
        tracing::info!(
            session = %self.id,
            parts = payload.parts.len(),
            digest = %payload.digest(),
            "submitting application"
        );

        Ok(SubmissionTicket {
            session_id: self.id.clone(),
            payload,
            in_flight: Arc::clone(&self.submitting),
        })
    }

    /// Applies the endpoint's answer for `ticket`.
    ///
    /// On failure the draft and step are untouched and the error is returned
    /// so the applicant can retry.
    pub fn complete_submission(
        &mut self,
        ticket: SubmissionTicket,
        outcome: Result<Receipt, EndpointError>,
    ) -> Result<Completion, SessionError> {
        if ticket.session_id != self.id || !self.is_submitting() {
            tracing::warn!(session = %self.id, ticket = %ticket.session_id, "ignoring stale submission result");
            return Ok(Completion::Ignored);
        }
        self.submitting.store(false, Ordering::Release);

        match outcome {
            Ok(receipt) => {
                if let Err(e) = self.store.mark_submitted(&receipt.application_number) {
                    tracing::error!(session = %self.id, error = %e, "submitted, but could not record it locally");
                }
                self.phase = Phase::Submitted;
                self.previews.clear();
                self.notice = Some(Notice::Submitted {
                    application_number: receipt.application_number.clone(),
                });
                tracing::info!(
                    session = %self.id,
                    application_number = %receipt.application_number,
                    "application submitted"
                );
                Ok(Completion::Submitted(receipt))
            }
            Err(e) => {
                tracing::warn!(session = %self.id, error = %e, "submission failed");
                self.notice = Some(Notice::SubmissionFailed {
                    reason: e.to_string(),
                });
                Err(e.into())
            }
        }
    }

    /// Gives up on an outstanding submission without an answer, e.g. when the
    /// host cancelled its request. The draft and step are untouched.
    pub fn abandon_submission(&mut self, ticket: SubmissionTicket) {
        if ticket.session_id == self.id {
            tracing::info!(session = %self.id, "submission abandoned");
        }
        drop(ticket);
    }

    /// Sends the application to `endpoint` in one go.
    pub fn submit<E: SubmissionEndpoint + ?Sized>(&mut self, endpoint: &E) -> Result<Completion, SessionError> {
        let ticket = self.begin_submission()?;
        let outcome = endpoint.submit(ticket.payload());
        self.complete_submission(ticket, outcome)
    }

    /// Leaves the confirmation view and starts a blank application.
    pub fn start_new_session(&mut self) -> Result<(), SessionError> {
        if self.phase != Phase::Submitted {
            return Err(SessionError::NotSubmitted);
        }
        self.store.reset()?;
        self.draft = Draft::default();
        self.phase = Phase::Editing { step: Step::FIRST };
        self.errors.clear();
        self.notice = None;
        self.previews.clear();
        tracing::info!(session = %self.id, "new application started");
        Ok(())
    }
}
