//! Expiry-driven document status.
//!
//! Status is a projection of `(expiry_date, today)` and nothing else. Stored
//! copies of it are a cache; readers always go through [`classify`].

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

/// Days before expiry at which a document counts as expiring.
pub const EXPIRY_WARNING_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "document_status", rename_all = "snake_case")]
pub enum DocumentStatus {
    Valid,
    #[serde(rename = "expiring_30_days")]
    #[sqlx(rename = "expiring_30_days")]
    Expiring30Days,
    Expired,
    Permanent,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Valid => "valid",
            DocumentStatus::Expiring30Days => "expiring_30_days",
            DocumentStatus::Expired => "expired",
            DocumentStatus::Permanent => "permanent",
        }
    }

    /// Expired or about to expire.
    pub fn needs_attention(&self) -> bool {
        matches!(self, DocumentStatus::Expired | DocumentStatus::Expiring30Days)
    }
}

/// Classify a document by calendar days remaining until `expiry`.
///
/// A document expiring today is already expired.
pub fn classify(expiry: Option<NaiveDate>, today: NaiveDate) -> DocumentStatus {
    let Some(expiry) = expiry else {
        return DocumentStatus::Permanent;
    };

    let days_remaining = (expiry - today).num_days();
    if days_remaining <= 0 {
        DocumentStatus::Expired
    } else if days_remaining <= EXPIRY_WARNING_DAYS {
        DocumentStatus::Expiring30Days
    } else {
        DocumentStatus::Valid
    }
}

/// Date at which the "expires in 30 days" reminder becomes due.
pub fn alert_date_for(expiry: NaiveDate) -> NaiveDate {
    expiry - Duration::days(EXPIRY_WARNING_DAYS)
}

/// Parse a calendar date as it arrives from forms and imports.
///
/// Accepts `YYYY-MM-DD`, `DD/MM/YYYY` and RFC 3339 timestamps (the time part
/// is dropped).
pub fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    let trimmed = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%d/%m/%Y") {
        return Ok(date);
    }
    if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(trimmed) {
        return Ok(ts.date_naive());
    }

    Err(format!(
        "failed to parse '{raw}' as YYYY-MM-DD or DD/MM/YYYY"
    ))
}

pub fn deserialize_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).map_err(serde::de::Error::custom)
}

/// Blank strings count as "no date", which is how forms send a cleared field.
pub fn deserialize_optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    opt.filter(|value| !value.trim().is_empty())
        .map(|value| parse_date(&value).map_err(serde::de::Error::custom))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).expect("valid date")
    }

    fn offset(days: i64) -> Option<NaiveDate> {
        Some(today() + Duration::days(days))
    }

    #[test]
    fn missing_expiry_is_permanent() {
        assert_eq!(classify(None, today()), DocumentStatus::Permanent);
    }

    #[test]
    fn boundaries_follow_calendar_days() {
        assert_eq!(classify(offset(-400), today()), DocumentStatus::Expired);
        assert_eq!(classify(offset(-1), today()), DocumentStatus::Expired);
        assert_eq!(classify(offset(0), today()), DocumentStatus::Expired);
        assert_eq!(classify(offset(1), today()), DocumentStatus::Expiring30Days);
        assert_eq!(classify(offset(30), today()), DocumentStatus::Expiring30Days);
        assert_eq!(classify(offset(31), today()), DocumentStatus::Valid);
        assert_eq!(classify(offset(3650), today()), DocumentStatus::Valid);
    }

    #[test]
    fn every_offset_lands_in_exactly_one_band() {
        for d in -60..=60 {
            let status = classify(offset(d), today());
            let expected = match d {
                d if d <= 0 => DocumentStatus::Expired,
                1..=30 => DocumentStatus::Expiring30Days,
                _ => DocumentStatus::Valid,
            };
            assert_eq!(status, expected, "offset {d}");
        }
    }

    #[test]
    fn classification_crosses_year_and_leap_day() {
        let today = NaiveDate::from_ymd_opt(2024, 2, 28).expect("valid date");
        let expiry = NaiveDate::from_ymd_opt(2024, 3, 30).expect("valid date");
        // 2024-02-29 exists, so this is 31 days out.
        assert_eq!(classify(Some(expiry), today), DocumentStatus::Valid);
    }

    #[test]
    fn alert_date_is_thirty_days_before_expiry() {
        let expiry = NaiveDate::from_ymd_opt(2024, 4, 14).expect("valid date");
        assert_eq!(
            alert_date_for(expiry),
            NaiveDate::from_ymd_opt(2024, 3, 15).expect("valid date")
        );
    }

    #[test]
    fn parses_iso_and_day_first_forms() {
        let expected = NaiveDate::from_ymd_opt(2025, 7, 4).expect("valid date");
        assert_eq!(parse_date("2025-07-04"), Ok(expected));
        assert_eq!(parse_date("04/07/2025"), Ok(expected));
        assert_eq!(parse_date(" 2025-07-04T10:30:00Z "), Ok(expected));
        assert!(parse_date("07-04-2025").is_err());
        assert!(parse_date("31/02/2025").is_err());
    }

    #[test]
    fn optional_date_treats_blank_as_absent() {
        #[derive(Deserialize)]
        struct Form {
            #[serde(default, deserialize_with = "deserialize_optional_date")]
            expiry_date: Option<NaiveDate>,
        }

        let blank: Form = serde_json::from_str(r#"{"expiry_date": ""}"#).expect("blank parses");
        assert_eq!(blank.expiry_date, None);

        let missing: Form = serde_json::from_str("{}").expect("missing parses");
        assert_eq!(missing.expiry_date, None);

        let dated: Form =
            serde_json::from_str(r#"{"expiry_date": "01/12/2026"}"#).expect("date parses");
        assert_eq!(dated.expiry_date, NaiveDate::from_ymd_opt(2026, 12, 1));
    }
}
