use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use pushgate_config::AuthSettings;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::SubjectRef;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Token expired")]
    TokenExpired,
    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

/// Claims minted by the host for a subject allowed to manage its own
/// subscriptions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default = "default_subject_type")]
    pub subject_type: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

fn default_subject_type() -> String {
    "user".to_string()
}

impl Claims {
    pub fn subject(&self) -> SubjectRef {
        SubjectRef::new(self.subject_type.clone(), self.sub.clone())
    }
}

/// Verifies tokens the host mints against the shared secret. This service
/// stores no credentials of its own.
pub struct AuthService {
    settings: AuthSettings,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthService {
    pub fn new(settings: AuthSettings) -> Self {
        let encoding_key = EncodingKey::from_secret(settings.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(settings.secret.as_bytes());
        Self {
            settings,
            encoding_key,
            decoding_key,
        }
    }

    pub fn generate_token(&self, subject: &SubjectRef) -> Result<String, AuthError> {
        let now = Utc::now();

        let claims = Claims {
            sub: subject.subject_id.clone(),
            subject_type: subject.subject_type.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.settings.token_ttl_secs as i64)).timestamp(),
            iss: self.settings.issuer.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.settings.issuer]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken(e.to_string()),
            }
        })?;

        Ok(token_data.claims)
    }
}
