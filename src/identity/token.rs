/// Identity token issuance and verification
///
/// Tokens are HS256 JWTs carrying the subject id and role. Every
/// verification failure surfaces as `Unauthorized`; expired and malformed
/// tokens are not distinguished to callers.
use super::{Identity, Role};
use crate::error::{ClinicError, ClinicResult};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    role: String,
    iat: i64,
    exp: i64,
}

/// Stateless token signer/verifier
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_seconds: i64,
    leeway_seconds: u64,
}

impl TokenService {
    pub fn new(secret: &str, ttl_seconds: i64, leeway_seconds: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl_seconds,
            leeway_seconds,
        }
    }

    /// Sign a token for the given subject and role
    pub fn issue_token(&self, subject_id: &str, role: Role) -> ClinicResult<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: subject_id.to_string(),
            role: role.as_str().to_string(),
            iat: now,
            exp: now + self.ttl_seconds,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ClinicError::Jwt(format!("Failed to generate token: {}", e)))
    }

    /// Verify a token and return the identity it encodes
    pub fn verify_token(&self, token: &str) -> ClinicResult<Identity> {
        if token.trim().is_empty() {
            return Err(ClinicError::Unauthorized("Missing token".to_string()));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.leeway_seconds;

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            tracing::warn!("Token verification failed: {}", e);
            ClinicError::Unauthorized("Invalid or expired token".to_string())
        })?;

        if data.claims.sub.is_empty() {
            return Err(ClinicError::Unauthorized("Invalid token subject".to_string()));
        }

        let role = Role::from_str(&data.claims.role).map_err(|_| {
            tracing::warn!("Token carries unknown role: {}", data.claims.role);
            ClinicError::Unauthorized("Invalid token role".to_string())
        })?;

        Ok(Identity {
            subject_id: data.claims.sub,
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-that-is-at-least-32-characters";

    fn service() -> TokenService {
        TokenService::new(SECRET, 3600, 0)
    }

    #[test]
    fn test_issue_and_verify() {
        let tokens = service();
        let token = tokens.issue_token("doctor-1", Role::Doctor).unwrap();

        let identity = tokens.verify_token(&token).unwrap();
        assert_eq!(identity, Identity::doctor("doctor-1"));
    }

    #[test]
    fn test_wrong_secret_is_unauthorized() {
        let token = service().issue_token("patient-1", Role::Patient).unwrap();
        let other = TokenService::new("another-secret-that-is-at-least-32-chars", 3600, 0);

        assert!(matches!(
            other.verify_token(&token),
            Err(ClinicError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_malformed_and_empty_are_unauthorized() {
        let tokens = service();
        assert!(matches!(
            tokens.verify_token("not.a.jwt"),
            Err(ClinicError::Unauthorized(_))
        ));
        assert!(matches!(
            tokens.verify_token(""),
            Err(ClinicError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_expired_is_unauthorized() {
        let expired = TokenService::new(SECRET, -120, 0);
        let token = expired.issue_token("doctor-1", Role::Doctor).unwrap();

        assert!(matches!(
            service().verify_token(&token),
            Err(ClinicError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_unknown_role_is_unauthorized() {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "someone".to_string(),
            role: "admin".to_string(),
            iat: now,
            exp: now + 60,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(matches!(
            service().verify_token(&token),
            Err(ClinicError::Unauthorized(_))
        ));
    }
}
