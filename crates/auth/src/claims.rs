use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Role;

/// Unverified claims read from a locally stored bearer token.
///
/// These only drive what the UI paints before the identity endpoint answers.
/// They never authorize anything: the guard decides on [`crate::Identity`]
/// once loading completes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionalClaims {
    pub role: Option<Role>,
    pub username: Option<String>,
}

impl ProvisionalClaims {
    pub fn is_empty(&self) -> bool {
        self.role.is_none() && self.username.is_none()
    }
}

/// base64url, padding optional.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Best-effort decode of a bearer token's payload.
///
/// Expects `header.payload.signature` where `payload` is a base64url JSON
/// object. Any deviation yields empty claims. No signature check, no expiry
/// check.
pub fn decode(token: &str) -> ProvisionalClaims {
    match payload_object(token) {
        Some(payload) => claims_from_payload(&payload),
        None => {
            tracing::debug!("bearer token payload unreadable; no provisional claims");
            ProvisionalClaims::default()
        }
    }
}

fn payload_object(token: &str) -> Option<serde_json::Map<String, Value>> {
    let mut segments = token.split('.');
    let (_header, payload, _signature) = (segments.next()?, segments.next()?, segments.next()?);
    if segments.next().is_some() || payload.is_empty() {
        return None;
    }

    // Tolerate tokens that were re-encoded with the standard alphabet.
    let normalized: String = payload
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();

    let bytes = PAYLOAD_ENGINE.decode(normalized.as_bytes()).ok()?;
    match serde_json::from_slice::<Value>(&bytes).ok()? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

fn claims_from_payload(payload: &serde_json::Map<String, Value>) -> ProvisionalClaims {
    let role = payload
        .get("role")
        .and_then(Value::as_str)
        .and_then(|r| r.parse::<Role>().ok());
    let username = payload
        .get("username")
        .and_then(Value::as_str)
        .map(str::to_string);

    ProvisionalClaims { role, username }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD};

    fn token_with(payload: &str) -> String {
        format!(
            "{}.{}.sig",
            URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#),
            URL_SAFE_NO_PAD.encode(payload.as_bytes())
        )
    }

    #[test]
    fn decodes_role_and_username() {
        let claims = decode(&token_with(r#"{"role":"doctor","username":"drsmith","exp":1}"#));
        assert_eq!(claims.role, Some(Role::Doctor));
        assert_eq!(claims.username.as_deref(), Some("drsmith"));
    }

    #[test]
    fn padded_payload_is_accepted() {
        let token = format!("h.{}.s", URL_SAFE.encode(br#"{"role":"admin"}"#));
        assert_eq!(decode(&token).role, Some(Role::Admin));
    }

    #[test]
    fn standard_alphabet_payload_is_accepted() {
        // "?>" encodes to characters outside the url-safe alphabet.
        let payload = r#"{"username":"a?>b","role":"receptionist"}"#;
        let encoded = STANDARD.encode(payload.as_bytes());
        let claims = decode(&format!("h.{encoded}.s"));
        assert_eq!(claims.username.as_deref(), Some("a?>b"));
        assert_eq!(claims.role, Some(Role::Receptionist));
    }

    #[test]
    fn unknown_role_keeps_username() {
        let claims = decode(&token_with(r#"{"role":"nurse","username":"amy"}"#));
        assert_eq!(claims.role, None);
        assert_eq!(claims.username.as_deref(), Some("amy"));
    }

    #[test]
    fn non_string_fields_are_ignored() {
        let claims = decode(&token_with(r#"{"role":3,"username":["x"]}"#));
        assert!(claims.is_empty());
    }

    #[test]
    fn malformed_tokens_yield_empty_claims() {
        let cases = [
            String::new(),
            "abc".to_string(),
            "a.b".to_string(),
            "a..c".to_string(),
            "a.b.c.d".to_string(),
            "h.!!!not-base64!!!.s".to_string(),
            format!("h.{}.s", URL_SAFE_NO_PAD.encode(b"not json")),
            token_with("[1,2,3]"),
            token_with("\"role\""),
            token_with("null"),
            format!("h.{}.s", URL_SAFE_NO_PAD.encode([0xff, 0xfe, 0xfd])),
        ];
        for case in cases {
            assert!(decode(&case).is_empty(), "expected empty claims for {case:?}");
        }
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: decoding arbitrary input never panics and only ever
            /// yields roles from the closed enumeration.
            #[test]
            fn decode_is_total(input in ".*") {
                let claims = decode(&input);
                if let Some(role) = claims.role {
                    prop_assert!(Role::ALL.contains(&role));
                }
            }

            /// Property: well-formed tokens return exactly what they carry.
            #[test]
            fn decode_returns_embedded_claims(
                role_idx in 0usize..3,
                username in "[A-Za-z0-9_.@+-]{1,32}",
            ) {
                let role = Role::ALL[role_idx];
                let payload = serde_json::json!({ "role": role.as_str(), "username": username });
                let claims = decode(&token_with(&payload.to_string()));
                prop_assert_eq!(claims.role, Some(role));
                prop_assert_eq!(claims.username, Some(username));
            }
        }
    }
}
