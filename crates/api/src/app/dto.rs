use std::collections::BTreeSet;

use axum::{extract::rejection::JsonRejection, Json};
use serde::Deserialize;

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: Option<String>,
    #[serde(rename = "memberEmails", default)]
    pub member_emails: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct MemberEmailsRequest {
    #[serde(rename = "memberEmails")]
    pub member_emails: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    pub amount: Option<f64>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteTransactionRequest {
    #[serde(rename = "_id")]
    pub id: Option<String>,
}

// -------------------------
// Validation helpers
// -------------------------

/// Request body, parsed only once the session has been verified.
pub fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, axum::response::Response> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| errors::json_error(rejection.status(), rejection.body_text()))
}

/// Trimmed, non-empty value of a required field.
pub fn required(value: Option<String>) -> Result<String, axum::response::Response> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| errors::bad_request("Missing parameters"))
}

/// Loose email shape: `local@domain.tld`, no whitespace.
pub fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
}

/// Trimmed, validated member set.
pub fn member_emails(raw: Vec<String>) -> Result<BTreeSet<String>, axum::response::Response> {
    let mut emails = BTreeSet::new();
    for email in raw {
        let email = email.trim().to_string();
        if !is_email(&email) {
            return Err(errors::bad_request(format!("Invalid email '{email}'")));
        }
        emails.insert(email);
    }
    Ok(emails)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape() {
        assert!(is_email("a@x.com"));
        assert!(is_email("first.last@mail.example.org"));
        assert!(!is_email("a@x"));
        assert!(!is_email("@x.com"));
        assert!(!is_email("a@@x.com"));
        assert!(!is_email("a b@x.com"));
        assert!(!is_email("plain"));
    }

    #[test]
    fn required_rejects_blank_values() {
        assert_eq!(required(Some(" food ".into())).unwrap(), "food");
        assert!(required(Some("   ".into())).is_err());
        assert!(required(None).is_err());
    }

    #[test]
    fn member_emails_are_trimmed_and_deduplicated() {
        let emails = member_emails(vec![" a@x.com".into(), "a@x.com".into()]).unwrap();
        assert_eq!(emails.len(), 1);
        assert!(emails.contains("a@x.com"));
        assert!(member_emails(vec!["nope".into()]).is_err());
    }
}
