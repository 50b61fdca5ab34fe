//! JWT token pair issuance and validation.
//!
//! Access and refresh tokens are signed with distinct secrets. Access tokens
//! are short-lived and stateless; refresh tokens are long-lived and must also
//! match the single record kept in the refresh-credential store.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Token type for distinguishing access vs refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived access token (15 minutes) - stateless
    Access,
    /// Long-lived refresh token (7 days) - matched against the store
    Refresh,
}

/// Claims carried by both token types: identity plus expiration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user UUID)
    pub sub: String,
    /// Token type
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Access token duration: 15 minutes
pub const ACCESS_TOKEN_DURATION_SECS: u64 = 15 * 60;

/// Refresh token duration: 7 days
pub const REFRESH_TOKEN_DURATION_SECS: u64 = 7 * 24 * 60 * 60;

/// A freshly signed token with its lifetime.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The JWT token string
    pub token: String,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: u64,
    /// Token duration in seconds
    pub duration: u64,
}

/// An access/refresh token pair for one identity.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

/// Signs and validates both token types. Each type has its own secret, so a
/// refresh token can never pass access validation even if the `typ` claim
/// were forged.
#[derive(Clone)]
pub struct TokenIssuer {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
}

impl TokenIssuer {
    /// Create a new issuer with distinct access and refresh secrets.
    pub fn new(access_secret: &[u8], refresh_secret: &[u8]) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(access_secret),
            access_decoding: DecodingKey::from_secret(access_secret),
            refresh_encoding: EncodingKey::from_secret(refresh_secret),
            refresh_decoding: DecodingKey::from_secret(refresh_secret),
        }
    }

    /// Generate an access token for an identity (15 minutes, stateless).
    pub fn generate_access_token(&self, identity: &str) -> Result<IssuedToken, TokenError> {
        self.generate(
            identity,
            TokenType::Access,
            ACCESS_TOKEN_DURATION_SECS,
            &self.access_encoding,
        )
    }

    /// Generate a refresh token for an identity (7 days). The caller is
    /// responsible for writing it to the refresh-credential store.
    pub fn generate_refresh_token(&self, identity: &str) -> Result<IssuedToken, TokenError> {
        self.generate(
            identity,
            TokenType::Refresh,
            REFRESH_TOKEN_DURATION_SECS,
            &self.refresh_encoding,
        )
    }

    /// Generate the access/refresh pair issued on login and signup.
    pub fn generate_token_pair(&self, identity: &str) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access: self.generate_access_token(identity)?,
            refresh: self.generate_refresh_token(identity)?,
        })
    }

    fn generate(
        &self,
        identity: &str,
        token_type: TokenType,
        duration: u64,
        key: &EncodingKey,
    ) -> Result<IssuedToken, TokenError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| TokenError::TimeError)?
            .as_secs();

        let exp = now + duration;

        let claims = Claims {
            sub: identity.to_string(),
            token_type,
            iat: now,
            exp,
        };

        let token =
            jsonwebtoken::encode(&Header::default(), &claims, key).map_err(TokenError::Encoding)?;

        Ok(IssuedToken {
            token,
            expires_at: exp,
            duration,
        })
    }

    /// Validate and decode an access token. Expired tokens are reported
    /// distinctly so the guard can return a machine-distinguishable reason.
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, TokenError> {
        Self::validate(token, TokenType::Access, &self.access_decoding)
    }

    /// Validate and decode a refresh token.
    pub fn validate_refresh_token(&self, token: &str) -> Result<Claims, TokenError> {
        Self::validate(token, TokenType::Refresh, &self.refresh_decoding)
    }

    fn validate(token: &str, expected: TokenType, key: &DecodingKey) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let token_data =
            jsonwebtoken::decode::<Claims>(token, key, &validation).map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Decoding(e),
            })?;

        if token_data.claims.token_type != expected {
            return Err(TokenError::WrongTokenType);
        }

        Ok(token_data.claims)
    }
}

/// Errors that can occur during token operations.
#[derive(Debug)]
pub enum TokenError {
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// Error decoding the token (bad signature, malformed, ...)
    Decoding(jsonwebtoken::errors::Error),
    /// Token signature is valid but the token has expired
    Expired,
    /// System time error
    TimeError,
    /// Wrong token type (e.g., using refresh token as access token)
    WrongTokenType,
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            TokenError::Decoding(e) => write!(f, "Failed to decode token: {}", e),
            TokenError::Expired => write!(f, "Token has expired"),
            TokenError::TimeError => write!(f, "System time error"),
            TokenError::WrongTokenType => write!(f, "Wrong token type"),
        }
    }
}

impl std::error::Error for TokenError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(
            b"test-access-secret-for-testing",
            b"test-refresh-secret-for-testing",
        )
    }

    #[test]
    fn test_generate_and_validate_access_token() {
        let issuer = issuer();

        let result = issuer.generate_access_token("uuid-123").unwrap();
        assert_eq!(result.duration, ACCESS_TOKEN_DURATION_SECS);

        let claims = issuer.validate_access_token(&result.token).unwrap();
        assert_eq!(claims.sub, "uuid-123");
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.exp, result.expires_at);
    }

    #[test]
    fn test_generate_and_validate_refresh_token() {
        let issuer = issuer();

        let result = issuer.generate_refresh_token("uuid-123").unwrap();
        assert_eq!(result.duration, REFRESH_TOKEN_DURATION_SECS);

        let claims = issuer.validate_refresh_token(&result.token).unwrap();
        assert_eq!(claims.sub, "uuid-123");
        assert_eq!(claims.token_type, TokenType::Refresh);
    }

    #[test]
    fn test_token_pair_has_distinct_lifetimes() {
        let pair = issuer().generate_token_pair("uuid-123").unwrap();

        assert_eq!(pair.access.duration, ACCESS_TOKEN_DURATION_SECS);
        assert_eq!(pair.refresh.duration, REFRESH_TOKEN_DURATION_SECS);
        assert!(pair.refresh.expires_at > pair.access.expires_at);
    }

    #[test]
    fn test_wrong_token_type_rejected() {
        let issuer = issuer();

        let access = issuer.generate_access_token("uuid-123").unwrap();
        let refresh = issuer.generate_refresh_token("uuid-123").unwrap();

        // The secrets differ, so cross-validation fails on signature alone
        assert!(issuer.validate_refresh_token(&access.token).is_err());
        assert!(issuer.validate_access_token(&refresh.token).is_err());
    }

    #[test]
    fn test_same_secret_still_rejects_wrong_type() {
        // Even with identical secrets, the typ claim is enforced
        let issuer = TokenIssuer::new(b"shared-secret", b"shared-secret");

        let refresh = issuer.generate_refresh_token("uuid-123").unwrap();
        let result = issuer.validate_access_token(&refresh.token);

        assert!(matches!(result, Err(TokenError::WrongTokenType)));
    }

    #[test]
    fn test_invalid_token() {
        let result = issuer().validate_access_token("invalid-token");
        assert!(result.is_err());
    }

    #[test]
    fn test_wrong_secret() {
        let issuer1 = TokenIssuer::new(b"access-1", b"refresh-1");
        let issuer2 = TokenIssuer::new(b"access-2", b"refresh-2");

        let result = issuer1.generate_access_token("uuid-123").unwrap();

        assert!(issuer2.validate_access_token(&result.token).is_err());
    }

    #[test]
    fn test_expired_token_reported_distinctly() {
        let secret = b"test-secret";
        let encoding_key = jsonwebtoken::EncodingKey::from_secret(secret);

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();

        let claims = Claims {
            sub: "uuid-123".to_string(),
            token_type: TokenType::Access,
            iat: now - 100,
            exp: now - 50, // Expired 50 seconds ago
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &encoding_key).unwrap();

        let issuer = TokenIssuer::new(secret, b"other-secret");
        let result = issuer.validate_access_token(&token);
        assert!(matches!(result, Err(TokenError::Expired)));
    }
}
