//! USSD services and mobile network operators - the reference tables flows hang off.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Short codes such as `*384#` or `*384*12#`
static USSD_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\*\d{1,4}(\*\d{1,4})*#$").expect("valid USSD code regex"));

/// Check a USSD short code
pub fn is_valid_ussd_code(code: &str) -> bool {
    USSD_CODE.is_match(code)
}

/// A dialable USSD service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, JsonSchema)]
#[ts(export)]
pub struct UssdService {
    pub id: Uuid,

    pub name: String,

    /// Short code dialled by subscribers
    pub ussd_code: String,

    /// Network the code is provisioned on
    #[serde(default)]
    pub mno_id: Option<Uuid>,

    #[serde(default)]
    pub description: String,

    #[serde(default = "default_true")]
    pub is_active: bool,

    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// A mobile network operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, JsonSchema)]
#[ts(export)]
pub struct Mno {
    pub id: Uuid,

    pub name: String,

    /// ISO country code
    pub country: String,

    /// Mobile country + network code (e.g. "64002")
    #[serde(default)]
    pub mcc_mnc: Option<String>,

    #[serde(default = "default_true")]
    pub is_active: bool,

    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl UssdService {
    pub fn new(name: impl Into<String>, ussd_code: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            ussd_code: ussd_code.into(),
            mno_id: None,
            description: String::new(),
            is_active: true,
            created_at: Utc::now(),
        }
    }
}

impl Mno {
    pub fn new(name: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            country: country.into(),
            mcc_mnc: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ussd_codes() {
        assert!(is_valid_ussd_code("*384#"));
        assert!(is_valid_ussd_code("*150*01#"));
        assert!(!is_valid_ussd_code("384#"));
        assert!(!is_valid_ussd_code("*384"));
        assert!(!is_valid_ussd_code("*abc#"));
        assert!(!is_valid_ussd_code("*12345#"));
    }
}
