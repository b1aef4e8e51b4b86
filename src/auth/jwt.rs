//! Bearer token validation for admin endpoints.

use jsonwebtoken::{Algorithm, DecodingKey, Validation};

use super::claims::Claims;
use crate::error::{PaymentError, Result};

/// Decodes HS256 tokens and asserts the admin role claim.
#[derive(Clone)]
pub struct AdminTokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AdminTokenVerifier {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Validates a raw `Authorization` header value of the form `Bearer <token>`.
    pub fn verify_header(&self, header: Option<&str>) -> Result<Claims> {
        let header = header.ok_or_else(|| {
            PaymentError::Unauthorized("Missing authorization header".to_string())
        })?;
        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                PaymentError::Unauthorized("Expected a bearer token".to_string())
            })?;
        self.verify(token)
    }

    pub fn verify(&self, token: &str) -> Result<Claims> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| PaymentError::Unauthorized(format!("Invalid token: {}", e)))?;

        if !data.claims.is_admin() {
            return Err(PaymentError::Unauthorized(
                "Admin role required".to_string(),
            ));
        }
        Ok(data.claims)
    }
}
