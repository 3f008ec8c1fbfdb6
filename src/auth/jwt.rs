use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::{debug, error};
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::error::AuthError;

/// JWT payload: the subject (user id) plus issue/expiry instants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: usize,
    pub exp: usize,
}

/// Immutable signing configuration, built once from `AppConfig` at startup
/// and injected wherever tokens are issued or verified.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    header: Header,
    validation: Validation,
    pub default_ttl: Duration,
}

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        let mut validation = Validation::new(cfg.algorithm);
        // No clock leeway: a token whose expiry has passed is rejected
        // immediately.
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            header: Header::new(cfg.algorithm),
            validation,
            default_ttl: Duration::minutes(cfg.ttl_minutes),
        }
    }

    /// Issues a token for `user_id` expiring after the configured default TTL.
    pub fn sign(&self, user_id: Uuid) -> Result<String, AuthError> {
        self.sign_with_ttl(user_id, self.default_ttl)
    }

    pub fn sign_with_ttl(&self, user_id: Uuid, ttl: Duration) -> Result<String, AuthError> {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: (now + ttl).unix_timestamp() as usize,
        };
        let token = encode(&self.header, &claims, &self.encoding).map_err(|e| {
            error!(error = %e, "jwt encode error");
            AuthError::Sign(e.to_string())
        })?;
        debug!(user_id = %user_id, "jwt signed");
        Ok(token)
    }

    /// Decodes and verifies a token. Bad signature, structural garbage and
    /// past expiry all collapse into the one `InvalidToken` outcome; the
    /// precise reason only goes to the log.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            debug!(error = %e, "jwt rejected");
            AuthError::InvalidToken
        })?;
        // A token is only valid strictly before its expiry; the decoder's own
        // check lets exp == now through.
        if data.claims.exp as i64 <= OffsetDateTime::now_utc().unix_timestamp() {
            debug!(user_id = %data.claims.sub, "jwt rejected: expired");
            return Err(AuthError::InvalidToken);
        }
        debug!(user_id = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}
