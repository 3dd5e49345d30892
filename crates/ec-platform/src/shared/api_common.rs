//! Common API types and utilities

use axum::{extract::FromRequest, Json};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;

use crate::shared::error::ClinicError;

/// JSON request body whose rejections become `ClinicError::Validation`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ClinicError))]
pub struct JsonBody<T>(pub T);

/// `{ "ok": true, ...body }` response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(flatten)]
    pub body: T,
}

/// Wrap a body in a successful envelope.
pub fn ok<T: Serialize>(body: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse { ok: true, body })
}

/// Empty body for operations that only report success.
#[derive(Debug, Default, Serialize, ToSchema)]
pub struct Ack {}

/// Created response with ID
#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedResponse {
    pub id: String,
}

impl CreatedResponse {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Map a multipart read failure to a client error.
pub fn invalid_form(e: impl std::fmt::Display) -> ClinicError {
    warn!(error = %e, "Invalid multipart body");
    ClinicError::validation("Invalid form data")
}

/// Trim a string and drop it if nothing is left.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Parse `YYYY-MM-DD` (midnight UTC) or an RFC 3339 timestamp.
pub fn parse_date_input(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
}

/// Lenient field parsing for form-style payloads, where numbers and
/// booleans may arrive as strings.
pub mod lenient {
    use serde::{de, Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNum {
        Num(f64),
        Str(String),
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrBool {
        Bool(bool),
        Str(String),
    }

    /// Number or numeric string; empty strings and null become `None`.
    pub fn f64_opt<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<StringOrNum>::deserialize(deserializer)? {
            Some(StringOrNum::Num(n)) => Ok(Some(n)),
            Some(StringOrNum::Str(s)) if s.trim().is_empty() => Ok(None),
            Some(StringOrNum::Str(s)) => s.trim().parse().map(Some).map_err(de::Error::custom),
            None => Ok(None),
        }
    }

    /// Boolean or the strings "true"/"false"; anything else is false.
    pub fn bool_opt<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<StringOrBool>::deserialize(deserializer)? {
            Some(StringOrBool::Bool(b)) => Some(b),
            Some(StringOrBool::Str(s)) => Some(parse_flag(&s)),
            None => None,
        })
    }

    pub fn parse_flag(value: &str) -> bool {
        value.trim().eq_ignore_ascii_case("true")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "lenient::f64_opt")]
        stock: Option<f64>,
        #[serde(default, deserialize_with = "lenient::bool_opt")]
        completed: Option<bool>,
    }

    #[test]
    fn test_lenient_numbers() {
        let s: Sample = serde_json::from_str(r#"{"stock":"12"}"#).unwrap();
        assert_eq!(s.stock, Some(12.0));
        let s: Sample = serde_json::from_str(r#"{"stock":4.5}"#).unwrap();
        assert_eq!(s.stock, Some(4.5));
        let s: Sample = serde_json::from_str(r#"{"stock":""}"#).unwrap();
        assert_eq!(s.stock, None);
        let s: Sample = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(s.stock, None);
        assert!(serde_json::from_str::<Sample>(r#"{"stock":"lots"}"#).is_err());
    }

    #[test]
    fn test_lenient_flags() {
        let s: Sample = serde_json::from_str(r#"{"completed":"true"}"#).unwrap();
        assert_eq!(s.completed, Some(true));
        let s: Sample = serde_json::from_str(r#"{"completed":true}"#).unwrap();
        assert_eq!(s.completed, Some(true));
        let s: Sample = serde_json::from_str(r#"{"completed":"no"}"#).unwrap();
        assert_eq!(s.completed, Some(false));
    }

    #[test]
    fn test_envelope_flattens_body() {
        let json = serde_json::to_value(ApiResponse { ok: true, body: CreatedResponse::new("A1") }).unwrap();
        assert_eq!(json, serde_json::json!({"ok": true, "id": "A1"}));

        let json = serde_json::to_value(ApiResponse { ok: true, body: Ack::default() }).unwrap();
        assert_eq!(json, serde_json::json!({"ok": true}));
    }

    #[test]
    fn test_parse_date_input() {
        use chrono::TimeZone;
        assert_eq!(
            parse_date_input("2025-05-01"),
            Some(Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(
            parse_date_input("2025-05-01T08:30:00+01:00"),
            Some(Utc.with_ymd_and_hms(2025, 5, 1, 7, 30, 0).unwrap())
        );
        assert_eq!(parse_date_input("next week"), None);
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("  x ".into())), Some("x".into()));
        assert_eq!(non_empty(Some("   ".into())), None);
        assert_eq!(non_empty(None), None);
    }
}
