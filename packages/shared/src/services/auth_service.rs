use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::config::{required_env, ConfigError};
use crate::models::auth::responses::{LoginResponse, TokenClaims};
use crate::models::caller::CallerIdentity;
use crate::services::errors::auth_service_errors::AuthServiceError;

#[cfg(test)]
use mockall::automock;

#[cfg_attr(test, automock)]
pub trait AuthServiceTrait: Send + Sync {
    fn verify_token(&self, token: &str) -> Result<TokenClaims, AuthServiceError>;
    fn caller_from_token(&self, token: &str) -> Result<CallerIdentity, AuthServiceError>;
    fn generate_token(
        &self,
        subject: &str,
        name: Option<String>,
    ) -> Result<LoginResponse, AuthServiceError>;
}

/// Verifies account bearer tokens issued with the shared HS256 secret.
pub struct AuthService {
    jwt_secret: String,
}

impl AuthService {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(AuthService {
            jwt_secret: required_env("JWT_SECRET")?,
        })
    }

    pub fn with_jwt_secret(jwt_secret: String) -> Self {
        AuthService { jwt_secret }
    }
}

impl AuthServiceTrait for AuthService {
    fn generate_token(
        &self,
        subject: &str,
        name: Option<String>,
    ) -> Result<LoginResponse, AuthServiceError> {
        if subject.trim().is_empty() {
            return Err(AuthServiceError::ValidationError(
                "Subject cannot be empty".to_string(),
            ));
        }

        let now = Utc::now();
        let expires_in = 24 * 60 * 60; // 24 hours in seconds
        let exp = (now + Duration::hours(24)).timestamp() as usize;
        let iat = now.timestamp() as usize;

        let claims = TokenClaims {
            sub: subject.to_string(),
            name,
            exp,
            iat,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )
        .map_err(|e| AuthServiceError::JwtError(format!("{:#?}", e)))?;

        Ok(LoginResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_in,
        })
    }

    fn verify_token(&self, token: &str) -> Result<TokenClaims, AuthServiceError> {
        let decoding_key = DecodingKey::from_secret(self.jwt_secret.as_ref());
        let validation = Validation::default();

        match decode::<TokenClaims>(token, &decoding_key, &validation) {
            Ok(token_data) => {
                let now = Utc::now().timestamp() as usize;
                if token_data.claims.exp < now {
                    Err(AuthServiceError::ExpiredToken)
                } else {
                    Ok(token_data.claims)
                }
            }
            Err(err) => match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    Err(AuthServiceError::ExpiredToken)
                }
                _ => Err(AuthServiceError::InvalidToken),
            },
        }
    }

    fn caller_from_token(&self, token: &str) -> Result<CallerIdentity, AuthServiceError> {
        let claims = self.verify_token(token)?;
        CallerIdentity::from_parts(Some(claims.sub), claims.name, None)
            .ok_or(AuthServiceError::InvalidToken)
    }
}
