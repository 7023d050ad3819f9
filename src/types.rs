//! Small shared types: timestamps, field kinds and the validation error map
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Field name -> human readable message. Empty means the step is valid.
pub type ErrorMap = BTreeMap<&'static str, String>;

/// How raw input for a field is normalised before it is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Stored verbatim.
    Text,
    /// Digits only, at most 10 of them.
    Phone,
    /// Number clamped to [0, 100].
    Percent,
    /// Number clamped to >= 0.
    Amount,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

// Ordered by instant.
impl Ord for TimeStamp<Utc> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl PartialOrd for TimeStamp<Utc> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl TimeStamp<Utc> {
    pub fn now() -> Self {
        Self(Utc::now())
    }
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
            .single()
            .map(Self)
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
    pub fn date(&self) -> NaiveDate {
        self.0.date_naive()
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimeStamp<T> {
    fn from(value: DateTime<T>) -> Self {
        TimeStamp(value)
    }
}

// Millisecond precision is enough for submission records.
impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.i64(self.0.timestamp_millis())?.ok()
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let millis = d.i64()?;

        DateTime::from_timestamp_millis(millis)
            .map(TimeStamp)
            .ok_or(minicbor::decode::Error::message(
                "timestamp is out of range for utc",
            ))
    }
}

/// Today's date as `YYYY-MM-DD`, the default for the verification date.
pub fn today_iso() -> String {
    Utc::now().date_naive().format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_encoding_keeps_millis() {
        let original: TimeStamp<Utc> = DateTime::from_timestamp_millis(1_717_171_717_123)
            .unwrap()
            .into();

        let encoding = minicbor::to_vec(&original).unwrap();
        let decoded: TimeStamp<Utc> = minicbor::decode(&encoding).unwrap();

        assert_eq!(original, decoded);
    }

    #[test]
    fn from_ymd_rejects_impossible_dates() {
        assert!(TimeStamp::from_ymd(2024, 2, 30).is_none());
        assert_eq!(
            TimeStamp::from_ymd(2024, 6, 15).unwrap().date().to_string(),
            "2024-06-15"
        );
    }

    #[test]
    fn timestamps_order_by_instant() {
        let earlier = TimeStamp::from_ymd(2024, 12, 31).unwrap();
        let later = TimeStamp::from_ymd(2025, 1, 1).unwrap();

        assert!(earlier < later);
        assert_eq!(later.cmp(&earlier), Ordering::Greater);
        assert_eq!(earlier.clone().max(later.clone()), later);
    }

    #[test]
    fn today_is_iso_formatted() {
        let today = today_iso();
        assert_eq!(today.len(), 10);
        assert!(NaiveDate::parse_from_str(&today, "%Y-%m-%d").is_ok());
    }
}
