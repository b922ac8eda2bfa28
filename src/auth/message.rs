//! Signed sign-in message verification
//!
//! Two wire formats are accepted. The structured format carries its fields
//! explicitly and is verified over a canonical text rendering, then checked
//! against the configured domain and statement. The legacy format is a
//! free-text message whose nonce and address are extracted by line
//! scanning; it carries no domain or statement, so no content check is
//! possible for it, and it is only accepted when legacy mode is enabled.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

use super::AuthError;

/// Structured sign-in fields, signed by the client over their canonical
/// message rendering
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SignInInput {
    pub nonce: String,
    pub domain: String,
    pub statement: String,
    pub address: String,
    pub chain_id: u64,
    pub issued_at: String,
}

impl SignInInput {
    /// Canonical text the client signs. Clients must render the exact same
    /// string for signatures to verify.
    pub fn canonical_message(&self) -> String {
        format!(
            "{domain} wants you to sign in with your account:\n\
             {address}\n\
             \n\
             {statement}\n\
             \n\
             Nonce: {nonce}\n\
             Chain ID: {chain_id}\n\
             Issued At: {issued_at}",
            domain = self.domain,
            address = self.address,
            statement = self.statement,
            nonce = self.nonce,
            chain_id = self.chain_id,
            issued_at = self.issued_at,
        )
    }
}

/// Sign-in payload in one of the supported wire formats
///
/// Untagged: a payload with an `input` object is structured, one with a
/// `rawMessage` string is legacy. Anything else fails deserialization and
/// is rejected as unsupported rather than falling back to an unverified
/// path.
#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
pub enum SignInPayload {
    Structured {
        input: SignInInput,
        /// Hex-encoded 64-byte Ed25519 signature, `0x` prefix optional
        signature: String,
        /// Hex-encoded 32-byte Ed25519 public key, `0x` prefix optional
        #[serde(rename = "publicKey")]
        public_key: String,
    },
    Legacy {
        #[serde(rename = "rawMessage")]
        raw_message: String,
        signature: String,
        #[serde(rename = "publicKey")]
        public_key: String,
    },
}

/// Expected message content, from configuration
#[derive(Debug, Clone)]
pub struct MessagePolicy {
    pub domain: String,
    pub statement: String,
    pub allow_legacy: bool,
}

/// Outcome of a successful verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedMessage {
    pub nonce: String,
    /// Lower-cased wallet address
    pub wallet_address: String,
}

/// Verify a sign-in payload.
///
/// `expected_nonce`, when supplied, is cross-checked against the nonce
/// embedded in a structured message; the caller is still responsible for
/// validating the extracted nonce against the nonce store.
pub fn verify_payload(
    payload: &SignInPayload,
    expected_nonce: Option<&str>,
    policy: &MessagePolicy,
) -> Result<VerifiedMessage, AuthError> {
    match payload {
        SignInPayload::Structured {
            input,
            signature,
            public_key,
        } => verify_structured(input, signature, public_key, expected_nonce, policy),
        SignInPayload::Legacy {
            raw_message,
            signature,
            public_key,
        } => {
            if !policy.allow_legacy {
                return Err(AuthError::UnsupportedMessageFormat);
            }
            verify_legacy(raw_message, signature, public_key)
        }
    }
}

fn verify_structured(
    input: &SignInInput,
    signature: &str,
    public_key: &str,
    expected_nonce: Option<&str>,
    policy: &MessagePolicy,
) -> Result<VerifiedMessage, AuthError> {
    // Signature first: content checks must never mask a forged message
    let message = input.canonical_message();
    check_signature(message.as_bytes(), signature, public_key)?;

    if let Some(expected) = expected_nonce {
        if input.nonce != expected {
            return Err(AuthError::MessageContentMismatch(
                "nonce does not match the issued challenge".to_string(),
            ));
        }
    }
    if input.domain != policy.domain {
        return Err(AuthError::MessageContentMismatch(format!(
            "unexpected domain '{}'",
            input.domain
        )));
    }
    if input.statement != policy.statement {
        return Err(AuthError::MessageContentMismatch(
            "unexpected statement".to_string(),
        ));
    }

    Ok(VerifiedMessage {
        nonce: input.nonce.clone(),
        wallet_address: input.address.to_lowercase(),
    })
}

fn verify_legacy(
    raw_message: &str,
    signature: &str,
    public_key: &str,
) -> Result<VerifiedMessage, AuthError> {
    let (nonce, address) = parse_legacy_message(raw_message)?;

    // The signature covers the full raw message bytes
    check_signature(raw_message.as_bytes(), signature, public_key)?;

    Ok(VerifiedMessage {
        nonce,
        wallet_address: address.to_lowercase(),
    })
}

/// Extract nonce and address from a legacy free-text message.
///
/// The nonce is taken from the first `Nonce: ` line; the address is the
/// line immediately following the greeting line and must be a
/// `0x`-prefixed token.
fn parse_legacy_message(raw_message: &str) -> Result<(String, String), AuthError> {
    let lines: Vec<&str> = raw_message.lines().collect();

    let nonce = lines
        .iter()
        .find_map(|line| line.trim().strip_prefix("Nonce: "))
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or(AuthError::UnsupportedMessageFormat)?;

    let address = lines
        .get(1)
        .map(|line| line.trim().to_string())
        .filter(|line| line.starts_with("0x") && !line.contains(char::is_whitespace))
        .ok_or(AuthError::UnsupportedMessageFormat)?;

    Ok((nonce, address))
}

fn check_signature(message: &[u8], signature: &str, public_key: &str) -> Result<(), AuthError> {
    let signature_bytes = decode_hex(signature, 64)?;
    let key_bytes = decode_hex(public_key, 32)?;

    let signature =
        Signature::from_slice(&signature_bytes).map_err(|_| AuthError::SignatureInvalid)?;

    let key_array: [u8; 32] = key_bytes
        .try_into()
        .map_err(|_| AuthError::SignatureInvalid)?;
    let verifying_key =
        VerifyingKey::from_bytes(&key_array).map_err(|_| AuthError::SignatureInvalid)?;

    verifying_key
        .verify(message, &signature)
        .map_err(|_| AuthError::SignatureInvalid)
}

fn decode_hex(value: &str, expected_len: usize) -> Result<Vec<u8>, AuthError> {
    let stripped = value.strip_prefix("0x").unwrap_or(value);
    let bytes = hex::decode(stripped).map_err(|_| AuthError::SignatureInvalid)?;
    if bytes.len() != expected_len {
        return Err(AuthError::SignatureInvalid);
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};
    use rand::rngs::OsRng;

    fn test_policy() -> MessagePolicy {
        MessagePolicy {
            domain: "relay-agent.io".to_string(),
            statement: "Sign in to Relay Agent.".to_string(),
            allow_legacy: true,
        }
    }

    fn test_input(nonce: &str) -> SignInInput {
        SignInInput {
            nonce: nonce.to_string(),
            domain: "relay-agent.io".to_string(),
            statement: "Sign in to Relay Agent.".to_string(),
            address: "0xAbCd1234".to_string(),
            chain_id: 1,
            issued_at: "2026-08-30T00:00:00Z".to_string(),
        }
    }

    fn sign(key: &SigningKey, message: &[u8]) -> String {
        hex::encode(key.sign(message).to_bytes())
    }

    fn pubkey_hex(key: &SigningKey) -> String {
        hex::encode(key.verifying_key().to_bytes())
    }

    #[test]
    fn test_structured_verification_succeeds() {
        let key = SigningKey::generate(&mut OsRng);
        let input = test_input("abc123");
        let signature = sign(&key, input.canonical_message().as_bytes());

        let payload = SignInPayload::Structured {
            input,
            signature,
            public_key: pubkey_hex(&key),
        };

        let verified = verify_payload(&payload, Some("abc123"), &test_policy()).unwrap();
        assert_eq!(verified.nonce, "abc123");
        assert_eq!(verified.wallet_address, "0xabcd1234");
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let key = SigningKey::generate(&mut OsRng);
        let input = test_input("abc123");
        let mut signature_bytes = key
            .sign(input.canonical_message().as_bytes())
            .to_bytes()
            .to_vec();
        signature_bytes[0] ^= 0x01;

        let payload = SignInPayload::Structured {
            input,
            signature: hex::encode(signature_bytes),
            public_key: pubkey_hex(&key),
        };

        let err = verify_payload(&payload, Some("abc123"), &test_policy()).unwrap_err();
        assert!(matches!(err, AuthError::SignatureInvalid));
    }

    #[test]
    fn test_domain_mismatch_is_content_error_not_signature_error() {
        let key = SigningKey::generate(&mut OsRng);
        let mut input = test_input("abc123");
        input.domain = "evil.example".to_string();
        // Signature is genuinely valid over the attacker's own content
        let signature = sign(&key, input.canonical_message().as_bytes());

        let payload = SignInPayload::Structured {
            input,
            signature,
            public_key: pubkey_hex(&key),
        };

        let err = verify_payload(&payload, Some("abc123"), &test_policy()).unwrap_err();
        assert!(matches!(err, AuthError::MessageContentMismatch(_)));
    }

    #[test]
    fn test_nonce_mismatch_is_content_error() {
        let key = SigningKey::generate(&mut OsRng);
        let input = test_input("abc123");
        let signature = sign(&key, input.canonical_message().as_bytes());

        let payload = SignInPayload::Structured {
            input,
            signature,
            public_key: pubkey_hex(&key),
        };

        let err = verify_payload(&payload, Some("other-nonce"), &test_policy()).unwrap_err();
        assert!(matches!(err, AuthError::MessageContentMismatch(_)));
    }

    #[test]
    fn test_legacy_verification_succeeds_without_domain_check() {
        let key = SigningKey::generate(&mut OsRng);
        let nonce = "a".repeat(64);
        let raw_message = format!(
            "Welcome to Relay Agent!\n0xDeadBeef\n\nNonce: {nonce}\nIssued At: 2026-08-30"
        );
        let signature = sign(&key, raw_message.as_bytes());

        let payload = SignInPayload::Legacy {
            raw_message,
            signature,
            public_key: pubkey_hex(&key),
        };

        let verified = verify_payload(&payload, None, &test_policy()).unwrap();
        assert_eq!(verified.nonce, nonce);
        assert_eq!(verified.wallet_address, "0xdeadbeef");
    }

    #[test]
    fn test_legacy_rejected_when_disabled() {
        let key = SigningKey::generate(&mut OsRng);
        let raw_message = "Greetings\n0xDeadBeef\nNonce: abc".to_string();
        let signature = sign(&key, raw_message.as_bytes());

        let payload = SignInPayload::Legacy {
            raw_message,
            signature,
            public_key: pubkey_hex(&key),
        };

        let mut policy = test_policy();
        policy.allow_legacy = false;

        let err = verify_payload(&payload, None, &policy).unwrap_err();
        assert!(matches!(err, AuthError::UnsupportedMessageFormat));
    }

    #[test]
    fn test_legacy_tampered_message_rejected() {
        let key = SigningKey::generate(&mut OsRng);
        let raw_message = "Greetings\n0xDeadBeef\nNonce: abc".to_string();
        let signature = sign(&key, raw_message.as_bytes());

        let payload = SignInPayload::Legacy {
            raw_message: "Greetings\n0xDeadBeef\nNonce: xyz".to_string(),
            signature,
            public_key: pubkey_hex(&key),
        };

        let err = verify_payload(&payload, None, &test_policy()).unwrap_err();
        assert!(matches!(err, AuthError::SignatureInvalid));
    }

    #[test]
    fn test_legacy_without_nonce_line_unsupported() {
        let key = SigningKey::generate(&mut OsRng);
        let raw_message = "Greetings\n0xDeadBeef\nNo challenge here".to_string();
        let signature = sign(&key, raw_message.as_bytes());

        let payload = SignInPayload::Legacy {
            raw_message,
            signature,
            public_key: pubkey_hex(&key),
        };

        let err = verify_payload(&payload, None, &test_policy()).unwrap_err();
        assert!(matches!(err, AuthError::UnsupportedMessageFormat));
    }

    #[test]
    fn test_legacy_without_address_line_unsupported() {
        let key = SigningKey::generate(&mut OsRng);
        let raw_message = "Greetings\nnot-an-address\nNonce: abc".to_string();
        let signature = sign(&key, raw_message.as_bytes());

        let payload = SignInPayload::Legacy {
            raw_message,
            signature,
            public_key: pubkey_hex(&key),
        };

        let err = verify_payload(&payload, None, &test_policy()).unwrap_err();
        assert!(matches!(err, AuthError::UnsupportedMessageFormat));
    }

    #[test]
    fn test_payload_deserializes_by_shape() {
        let structured: SignInPayload = serde_json::from_str(
            r#"{
                "input": {
                    "nonce": "n", "domain": "d", "statement": "s",
                    "address": "0x1", "chainId": 1, "issuedAt": "t"
                },
                "signature": "00", "publicKey": "00"
            }"#,
        )
        .unwrap();
        assert!(matches!(structured, SignInPayload::Structured { .. }));

        let legacy: SignInPayload = serde_json::from_str(
            r#"{"rawMessage": "hello", "signature": "00", "publicKey": "00"}"#,
        )
        .unwrap();
        assert!(matches!(legacy, SignInPayload::Legacy { .. }));

        // A malformed structured payload must not sneak through as anything
        let malformed = serde_json::from_str::<SignInPayload>(
            r#"{"input": "oops", "signature": "00", "publicKey": "00"}"#,
        );
        assert!(malformed.is_err());
    }
}
