//! Wire types shared by the HTTP server and its clients.
//!
//! Field names follow the JSON surface (camelCase); the structs stay snake_case.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Every response body is wrapped in this envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl Envelope<()> {
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    #[serde(rename = "joinedAt", alias = "createdAt", alias = "created_at")]
    pub created_at: DateTime<Utc>,
    #[serde(
        rename = "lastLogin",
        alias = "last_login",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub last_login: Option<DateTime<Utc>>,
}

/// Returned by register and login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthGrant {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedUser {
    pub user: UserProfile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalInfo {
    pub clues_found: u32,
    pub total_steps: Vec<String>,
    pub difficulty: String,
    pub hint: String,
}

/// The sealed evidence released by the reveal endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretPayload {
    pub secret_key: String,
    #[serde(default)]
    pub message: String,
    pub achievement: String,
    pub level: String,
    pub completed_at: DateTime<Utc>,
    pub additional_info: AdditionalInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseStatus {
    pub investigation_active: bool,
    pub steps_required: u32,
    pub current_step: String,
    pub hint: String,
    pub warning: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    #[serde(default)]
    pub environment: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_profile_accepts_row_style_names() {
        let json = r#"{"id":"7","username":"holmes","created_at":"2024-01-02T03:04:05Z","last_login":null}"#;
        let user: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(user.username, "holmes");
        assert!(user.last_login.is_none());
        let out = serde_json::to_value(&user).unwrap();
        assert!(out.get("joinedAt").is_some());
        assert!(out.get("lastLogin").is_none());
    }

    #[test]
    fn failure_envelope_omits_data() {
        let v = serde_json::to_value(Envelope::fail("ENDPOINT_NOT_FOUND")).unwrap();
        assert_eq!(v["success"], false);
        assert!(v.get("data").is_none());
    }

    #[test]
    fn secret_payload_uses_camel_case() {
        let payload = SecretPayload {
            secret_key: "K".into(),
            message: String::new(),
            achievement: "A".into(),
            level: "L".into(),
            completed_at: Utc::now(),
            additional_info: AdditionalInfo {
                clues_found: 3,
                total_steps: vec!["CIPHER_DECRYPTION".into()],
                difficulty: "D".into(),
                hint: "H".into(),
            },
        };
        let v = serde_json::to_value(&payload).unwrap();
        assert_eq!(v["secretKey"], "K");
        assert_eq!(v["additionalInfo"]["cluesFound"], 3);
        assert_eq!(v["additionalInfo"]["totalSteps"][0], "CIPHER_DECRYPTION");
    }
}
