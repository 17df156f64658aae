//! Outbound request interception and form-submission payload checks

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{E2eError, E2eResult};
use crate::suffix::UniqueSuffix;

/// `formValues` key holding the CAAT number
pub const FIELD_CAAT_NUMBER: &str = "Número CAAT";
/// `formValues` key holding the company name
pub const FIELD_COMPANY_NAME: &str = "Razón social";
/// `formValues` key holding the contact's full name
pub const FIELD_CONTACT_NAME: &str = "Nombre completo";

/// Handle to a registered interception
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InterceptId(pub u64);

/// Matches requests by method and exact URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMatcher {
    pub method: String,
    pub url: String,
}

impl RequestMatcher {
    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: "POST".to_string(),
            url: url.into(),
        }
    }

    pub fn matches(&self, method: &str, url: &str) -> bool {
        self.method.eq_ignore_ascii_case(method) && self.url == url
    }
}

impl fmt::Display for RequestMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// A request and the response it received
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedExchange {
    pub method: String,
    pub url: String,
    pub status: u16,

    /// Request body; JSON bodies are decoded, anything else is a string
    #[serde(default)]
    pub body: Value,
}

impl CapturedExchange {
    /// Decode the body as a collected-forms submission
    pub fn submission(&self) -> E2eResult<FormSubmission> {
        FormSubmission::from_body(&self.body)
    }
}

/// The fields of a collected-forms payload this runner cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSubmission {
    pub email: Option<String>,
    pub form_values: BTreeMap<String, String>,
}

impl FormSubmission {
    /// Accepts a decoded JSON body or a string containing JSON
    pub fn from_body(body: &Value) -> E2eResult<Self> {
        let decoded;
        let body = match body {
            Value::String(raw) => {
                decoded = serde_json::from_str::<Value>(raw)?;
                &decoded
            }
            other => other,
        };

        let email = body
            .pointer("/contactFields/email")
            .and_then(Value::as_str)
            .map(str::to_string);

        let form_values = match body.get("formValues") {
            Some(Value::Object(map)) => map
                .iter()
                .map(|(k, v)| {
                    let value = match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (k.clone(), value)
                })
                .collect(),
            Some(other) => {
                return Err(E2eError::mismatch("formValues", "an object", other.to_string()))
            }
            None => BTreeMap::new(),
        };

        Ok(Self { email, form_values })
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.form_values.get(key).map(String::as_str)
    }
}

/// Values the form submission must carry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedSubmission {
    pub email: String,
    pub cat_number: String,
    pub company_name: String,
    pub contact_name: String,
}

impl ExpectedSubmission {
    pub fn new(cat_number: &str, suffix: &UniqueSuffix) -> Self {
        Self {
            email: suffix.email(),
            cat_number: cat_number.to_string(),
            company_name: suffix.company_name(),
            contact_name: suffix.contact_name(),
        }
    }

    /// Check method, status and payload of a captured exchange
    pub fn verify(&self, exchange: &CapturedExchange) -> E2eResult<()> {
        if !exchange.method.eq_ignore_ascii_case("POST") {
            return Err(E2eError::mismatch("request method", "POST", &exchange.method));
        }
        if exchange.status != 204 {
            return Err(E2eError::mismatch(
                "response status",
                "204",
                exchange.status.to_string(),
            ));
        }

        let submission = exchange.submission()?;
        expect_field("contactFields.email", &self.email, submission.email.as_deref())?;
        expect_field(FIELD_CAAT_NUMBER, &self.cat_number, submission.value(FIELD_CAAT_NUMBER))?;
        expect_field(FIELD_COMPANY_NAME, &self.company_name, submission.value(FIELD_COMPANY_NAME))?;
        expect_field(FIELD_CONTACT_NAME, &self.contact_name, submission.value(FIELD_CONTACT_NAME))?;
        Ok(())
    }
}

fn expect_field(what: &str, expected: &str, actual: Option<&str>) -> E2eResult<()> {
    match actual {
        Some(actual) if actual == expected => Ok(()),
        Some(actual) => Err(E2eError::mismatch(what, expected, actual)),
        None => Err(E2eError::mismatch(what, expected, "<missing>")),
    }
}
