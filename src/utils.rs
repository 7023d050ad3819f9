//! Input normalisation and identifier helpers

use crate::types::FieldKind;
use bech32::Bech32m;
use uuid7::uuid7;

pub const PHONE_DIGITS: usize = 10;

// construct a unique id then encode using bech32
pub fn new_uuid_to_bech32(hrp: &str) -> anyhow::Result<String> {
    let hrp = bech32::Hrp::parse(hrp)?;
    let encode = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?;
    Ok(encode)
}

/// Application numbers handed back to applicants, e.g. `app_1qyz...`
pub fn new_application_number() -> anyhow::Result<String> {
    new_uuid_to_bech32("app_")
}

/// Normalise raw input for a field of the given kind.
///
/// Returns `None` when the input cannot be stored at all (a non-numeric
/// string for a numeric field), in which case the previous value stays.
pub fn normalise(kind: FieldKind, raw: &str) -> Option<String> {
    match kind {
        FieldKind::Text => Some(raw.to_string()),
        FieldKind::Phone => Some(
            raw.chars()
                .filter(char::is_ascii_digit)
                .take(PHONE_DIGITS)
                .collect(),
        ),
        FieldKind::Percent => clamp_number(raw, 0.0, 100.0),
        FieldKind::Amount => clamp_number(raw, 0.0, f64::MAX),
    }
}

fn clamp_number(raw: &str, min: f64, max: f64) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Some(String::new());
    }
    let value = raw.parse::<f64>().ok().filter(|v| v.is_finite())?;
    let clamped = value.clamp(min, max);
    // avoid rendering "-0"
    let clamped = if clamped == 0.0 { 0.0 } else { clamped };
    Some(clamped.to_string())
}

/// Ten digits, the first one 6-9.
pub fn is_valid_mobile(value: &str) -> bool {
    value.len() == PHONE_DIGITS
        && value.bytes().all(|b| b.is_ascii_digit())
        && matches!(value.as_bytes()[0], b'6'..=b'9')
}

/// `local@domain.tld`: one `@`, no whitespace, a dot inside the domain.
pub fn is_valid_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}
