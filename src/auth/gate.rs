//! Token issuance and validation
//!
//! The signing secret is handed in once at construction and never read from
//! the environment afterwards.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::error::AuthError;
use crate::account::Iban;
use crate::config::AuthConfig;

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // Subject (account IBAN)
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

/// Identity of a verified caller. Handlers receive it as an argument; it is
/// the only source of a transfer's debit side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedAccount {
    pub iban: Iban,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub struct AuthGate {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    ttl: Duration,
}

impl AuthGate {
    pub fn new(config: &AuthConfig) -> Self {
        let secret = if config.jwt_secret.is_empty() {
            tracing::warn!("No JWT secret configured; using an ephemeral one for this process");
            rand::thread_rng().r#gen::<[u8; 32]>().to_vec()
        } else {
            config.jwt_secret.as_bytes().to_vec()
        };

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.leeway = 5;

        Self {
            encoding_key: EncodingKey::from_secret(&secret),
            decoding_key: DecodingKey::from_secret(&secret),
            validation,
            issuer: config.issuer.clone(),
            ttl: Duration::minutes(config.token_ttl_minutes),
        }
    }

    pub fn issue(&self, iban: &Iban) -> Result<IssuedToken, AuthError> {
        self.issue_at(iban, Utc::now())
    }

    pub fn issue_at(&self, iban: &Iban, now: DateTime<Utc>) -> Result<IssuedToken, AuthError> {
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: iban.to_string(),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Verify signature, expiry and issuer.
    pub fn verify(&self, token: &str) -> Result<AuthenticatedAccount, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "Token rejected");
            AuthError::InvalidToken
        })?;
        let iban = Iban::parse(&data.claims.sub).map_err(|_| AuthError::InvalidToken)?;
        Ok(AuthenticatedAccount { iban })
    }

    /// Resolve an `Authorization` header value.
    pub fn verify_header(&self, header: Option<&str>) -> Result<AuthenticatedAccount, AuthError> {
        let header = header.ok_or(AuthError::MissingCredentials)?;
        let mut parts = header.split_whitespace();
        let token = match (parts.next(), parts.next(), parts.next()) {
            (Some("Bearer"), Some(token), None) => token,
            _ => return Err(AuthError::MalformedHeader),
        };
        self.verify(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(secret: &str) -> AuthConfig {
        AuthConfig {
            jwt_secret: secret.to_string(),
            issuer: "ledger".to_string(),
            token_ttl_minutes: 60,
        }
    }

    fn iban() -> Iban {
        Iban::parse("NL91ABNA0417164300").unwrap()
    }

    #[test]
    fn test_issue_then_verify() {
        let gate = AuthGate::new(&config("s3cret"));
        let issued = gate.issue(&iban()).unwrap();
        let who = gate.verify(&issued.token).unwrap();
        assert_eq!(who.iban, iban());
        assert!(issued.expires_at > Utc::now());
    }

    #[test]
    fn test_expired_token_rejected() {
        let gate = AuthGate::new(&config("s3cret"));
        let issued = gate
            .issue_at(&iban(), Utc::now() - Duration::hours(2))
            .unwrap();
        assert_eq!(gate.verify(&issued.token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_foreign_secret_rejected() {
        let ours = AuthGate::new(&config("s3cret"));
        let theirs = AuthGate::new(&config("other"));
        let issued = theirs.issue(&iban()).unwrap();
        assert_eq!(ours.verify(&issued.token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let ours = AuthGate::new(&config("s3cret"));
        let mut other = config("s3cret");
        other.issuer = "someone-else".into();
        let issued = AuthGate::new(&other).issue(&iban()).unwrap();
        assert_eq!(ours.verify(&issued.token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let gate = AuthGate::new(&config("s3cret"));
        let mut token = gate.issue(&iban()).unwrap().token;
        token.push('x');
        assert_eq!(gate.verify(&token), Err(AuthError::InvalidToken));
        assert_eq!(gate.verify("garbage"), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_ephemeral_secret_still_round_trips() {
        let gate = AuthGate::new(&config(""));
        let issued = gate.issue(&iban()).unwrap();
        assert!(gate.verify(&issued.token).is_ok());
    }

    #[test]
    fn test_verify_header() {
        let gate = AuthGate::new(&config("s3cret"));
        let token = gate.issue(&iban()).unwrap().token;

        assert_eq!(
            gate.verify_header(None),
            Err(AuthError::MissingCredentials)
        );
        assert_eq!(
            gate.verify_header(Some(&token)),
            Err(AuthError::MalformedHeader)
        );
        assert_eq!(
            gate.verify_header(Some(&format!("Basic {}", token))),
            Err(AuthError::MalformedHeader)
        );
        assert_eq!(
            gate.verify_header(Some(&format!("Bearer {} extra", token))),
            Err(AuthError::MalformedHeader)
        );
        assert!(gate.verify_header(Some(&format!("Bearer {}", token))).is_ok());
    }
}
