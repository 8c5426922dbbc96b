//! Identity providers

use super::{AuthError, Identity, IdentityProvider};
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::Deserialize;

/// Claims read from a Google ID token payload
#[derive(Debug, Deserialize)]
struct GoogleClaims {
    email: Option<String>,
    #[serde(default)]
    email_verified: Option<bool>,
    aud: Option<String>,
    name: Option<String>,
}

/// Google Sign-In ID tokens
///
/// Decodes the JWT payload and checks the audience and the verified-email
/// claim. Signature verification is left to Google's client library on the
/// front end, which hands us the credential.
#[derive(Debug, Clone, Default)]
pub struct GoogleCredentialProvider {
    client_id: Option<String>,
    allow_unverified_email: bool,
}

impl GoogleCredentialProvider {
    pub fn new(client_id: Option<String>, allow_unverified_email: bool) -> Self {
        Self {
            client_id: client_id.filter(|id| !id.trim().is_empty()),
            allow_unverified_email,
        }
    }

    fn claims(credential: &str) -> Result<GoogleClaims, AuthError> {
        let mut parts = credential.trim().split('.');
        let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(_), Some(payload), Some(_), None) => payload,
            _ => {
                return Err(AuthError::InvalidCredential(
                    "expected a JWT with three segments".to_string(),
                ))
            }
        };

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| AuthError::InvalidCredential(format!("payload is not base64url: {}", e)))?;

        serde_json::from_slice(&bytes)
            .map_err(|e| AuthError::InvalidCredential(format!("payload is not JSON: {}", e)))
    }
}

#[async_trait]
impl IdentityProvider for GoogleCredentialProvider {
    fn name(&self) -> &str {
        "google"
    }

    async fn verify(&self, credential: &str) -> Result<Identity, AuthError> {
        let claims = Self::claims(credential)?;

        if let Some(expected) = &self.client_id {
            if claims.aud.as_deref() != Some(expected.as_str()) {
                return Err(AuthError::AudienceMismatch(claims.aud.unwrap_or_default()));
            }
        }

        let email = claims
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| AuthError::InvalidCredential("missing email claim".to_string()))?;

        if claims.email_verified == Some(false) && !self.allow_unverified_email {
            return Err(AuthError::UnverifiedEmail(email));
        }

        Ok(Identity {
            email,
            name: claims.name,
        })
    }
}

/// Accepts any email address as its own credential
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityProvider;

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    fn name(&self) -> &str {
        "static"
    }

    async fn verify(&self, credential: &str) -> Result<Identity, AuthError> {
        let email = credential.trim();
        if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
            return Err(AuthError::InvalidCredential(format!("not an email address: {}", email)));
        }
        Ok(Identity {
            email: email.to_string(),
            name: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn token(claims: serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{}.{}.signature", header, payload)
    }

    #[tokio::test]
    async fn test_google_valid_token() {
        let provider = GoogleCredentialProvider::new(Some("client-1".to_string()), false);
        let identity = provider
            .verify(&token(json!({
                "email": "jane@example.com",
                "email_verified": true,
                "aud": "client-1",
                "name": "Jane"
            })))
            .await
            .unwrap();

        assert_eq!(identity.email, "jane@example.com");
        assert_eq!(identity.name.as_deref(), Some("Jane"));
    }

    #[tokio::test]
    async fn test_google_rejects_wrong_audience_and_unverified() {
        let provider = GoogleCredentialProvider::new(Some("client-1".to_string()), false);

        let wrong_aud = token(json!({"email": "a@b.c", "aud": "other"}));
        assert!(matches!(
            provider.verify(&wrong_aud).await,
            Err(AuthError::AudienceMismatch(aud)) if aud == "other"
        ));

        let unverified = token(json!({"email": "a@b.c", "aud": "client-1", "email_verified": false}));
        assert!(matches!(
            provider.verify(&unverified).await,
            Err(AuthError::UnverifiedEmail(_))
        ));

        let lenient = GoogleCredentialProvider::new(None, true);
        assert!(lenient.verify(&unverified).await.is_ok());
    }

    #[tokio::test]
    async fn test_google_rejects_malformed() {
        let provider = GoogleCredentialProvider::default();
        assert!(provider.verify("not-a-jwt").await.is_err());
        assert!(provider.verify("a.!!!.c").await.is_err());
        assert!(provider.verify(&token(json!({"aud": "x"}))).await.is_err());
    }

    #[tokio::test]
    async fn test_static_provider() {
        let provider = StaticIdentityProvider;
        assert_eq!(
            provider.verify(" bob@example.com ").await.unwrap().email,
            "bob@example.com"
        );
        assert!(provider.verify("bob").await.is_err());
    }
}
