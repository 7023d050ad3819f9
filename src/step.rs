//! The eleven form steps and the per-step validator
use crate::attachment::AttachmentSlot;
use crate::draft::{Draft, Field};
use crate::types::ErrorMap;
use crate::utils::{is_valid_email, is_valid_mobile};

pub const TOTAL_STEPS: u8 = 11;
pub const FIRST_STEP: u8 = 1;

/// 1-based step index, always within `FIRST_STEP..=TOTAL_STEPS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Step(u8);

impl Step {
    pub const FIRST: Step = Step(FIRST_STEP);
    pub const LAST: Step = Step(TOTAL_STEPS);

    pub fn new(n: u8) -> Option<Self> {
        (FIRST_STEP..=TOTAL_STEPS).contains(&n).then_some(Step(n))
    }

    pub fn number(self) -> u8 {
        self.0
    }

    pub fn is_last(self) -> bool {
        self == Self::LAST
    }

    /// Next step, capped at the last one.
    pub fn next(self) -> Self {
        Step(self.0.saturating_add(1).min(TOTAL_STEPS))
    }

    /// Previous step, floored at the first one.
    pub fn prev(self) -> Self {
        Step(self.0.saturating_sub(1).max(FIRST_STEP))
    }

    pub fn progress_percent(self) -> u8 {
        ((u32::from(self.0) * 100 + u32::from(TOTAL_STEPS) / 2) / u32::from(TOTAL_STEPS)) as u8
    }

    pub fn label(self) -> &'static str {
        match self.0 {
            1 => "Basic information",
            2 => "Registration and finance",
            3 => "Machinery and energy",
            4 => "Production and workforce",
            5 => "Financial performance",
            6 => "Technology and innovation",
            7 => "Human resources",
            8 => "Environment and compliance",
            9 => "Business development",
            10 => "Additional information",
            _ => "Verification",
        }
    }
}

/// Checks that gate leaving `step`. An empty map is the only pass.
///
/// Only steps 1, 2 and the last one carry required fields; the rest of the
/// form is supplementary and never blocks.
pub fn validate(draft: &Draft, step: Step) -> ErrorMap {
    let mut errors = ErrorMap::new();

    match step.number() {
        1 => {
            if draft.field(Field::UnitName).trim().is_empty() {
                errors.insert(Field::UnitName.as_str(), "Unit name is required".into());
            }
            let mobile = draft.field(Field::Mobile);
            if mobile.trim().is_empty() {
                errors.insert(Field::Mobile.as_str(), "Mobile number is required".into());
            } else if !is_valid_mobile(mobile) {
                errors.insert(
                    Field::Mobile.as_str(),
                    "Enter a valid 10 digit mobile number".into(),
                );
            }
            let email = draft.field(Field::Email);
            if !email.is_empty() && !is_valid_email(email) {
                errors.insert(Field::Email.as_str(), "Enter a valid email address".into());
            }
        }
        2 => {
            if draft.field(Field::UdyamNumber).trim().is_empty() {
                errors.insert(
                    Field::UdyamNumber.as_str(),
                    "Udyam registration number is required".into(),
                );
            }
        }
        TOTAL_STEPS => {
            if draft.attachment(AttachmentSlot::Signature).is_none() {
                errors.insert(
                    AttachmentSlot::Signature.as_str(),
                    "Please upload a signature".into(),
                );
            }
        }
        _ => {}
    }

    errors
}
