//! User access token verification against Authress signing keys.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{Jwk, JwkSet};
use jsonwebtoken::{DecodingKey, Validation};
use serde::Deserialize;

use accountgate_core::{AccountId, UserId};

use crate::AuthressError;

pub const JWKS_PATH: &str = "/.well-known/openid-configuration/jwks";

const JWKS_TTL: Duration = Duration::from_secs(60 * 60);
const CLOCK_SKEW_LEEWAY_SECS: u64 = 60;

/// Identity extracted from a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub user_id: UserId,
    pub issuer: String,
    /// Account of the SSO tenant the user logged in through, if any.
    pub tenant_id: Option<AccountId>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    fn values(&self) -> Vec<&str> {
        match self {
            Audience::One(a) => vec![a.as_str()],
            Audience::Many(a) => a.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AccessTokenClaims {
    sub: String,
    iss: String,
    #[serde(default)]
    aud: Option<Audience>,
}

#[derive(Debug, Deserialize)]
struct IssuerOnly {
    iss: String,
}

#[derive(Debug, Clone)]
struct CachedJwks {
    keys: JwkSet,
    fetched_at: Instant,
}

/// Verifies Authress-issued JWTs.
///
/// Only tokens whose issuer is the configured Authress domain (or a service
/// client under it) are accepted. Signing keys are fetched from the issuer
/// and cached per issuer.
#[derive(Debug)]
pub struct TokenVerifier {
    api_url: String,
    http: reqwest::Client,
    cache: Mutex<HashMap<String, CachedJwks>>,
}

impl TokenVerifier {
    pub fn new(api_url: &str, http: reqwest::Client) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            http,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_trusted_issuer(&self, issuer: &str) -> bool {
        let issuer = issuer.trim_end_matches('/');
        issuer == self.api_url
            || issuer
                .strip_prefix(self.api_url.as_str())
                .is_some_and(|rest| rest.starts_with("/v1/clients/"))
    }

    pub async fn verify(&self, token: &str) -> Result<VerifiedIdentity, AuthressError> {
        let header = jsonwebtoken::decode_header(token)
            .map_err(|e| AuthressError::token(format!("malformed token: {e}")))?;
        let kid = header
            .kid
            .ok_or_else(|| AuthressError::token("token header has no kid"))?;

        let issuer = unverified_issuer(token)?;
        if !self.is_trusted_issuer(&issuer) {
            return Err(AuthressError::token(format!("untrusted issuer '{issuer}'")));
        }

        let jwk = self.find_key(&issuer, &kid).await?;
        let key = DecodingKey::from_jwk(&jwk)
            .map_err(|e| AuthressError::token(format!("unusable signing key '{kid}': {e}")))?;

        let mut validation = Validation::new(header.alg);
        validation.validate_aud = false;
        validation.leeway = CLOCK_SKEW_LEEWAY_SECS;
        validation.set_issuer(&[issuer.as_str()]);

        let claims = jsonwebtoken::decode::<AccessTokenClaims>(token, &key, &validation)
            .map_err(|e| AuthressError::token(e.to_string()))?
            .claims;

        let tenant_id = claims
            .aud
            .as_ref()
            .and_then(|aud| aud.values().into_iter().find_map(|a| a.parse::<AccountId>().ok()));

        Ok(VerifiedIdentity {
            user_id: claims
                .sub
                .parse()
                .map_err(|_| AuthressError::token("token has an empty subject"))?,
            issuer: claims.iss,
            tenant_id,
        })
    }

    /// Cached key for `kid`, or a fresh key set fetched from the issuer.
    async fn find_key(&self, issuer: &str, kid: &str) -> Result<Jwk, AuthressError> {
        if let Some(jwk) = self.cached_key(issuer, kid) {
            return Ok(jwk);
        }

        let keys = self.fetch_jwks(issuer).await?;
        let jwk = keys.find(kid).cloned();
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                issuer.to_string(),
                CachedJwks {
                    keys,
                    fetched_at: Instant::now(),
                },
            );

        jwk.ok_or_else(|| AuthressError::token(format!("no signing key matches kid '{kid}'")))
    }

    fn cached_key(&self, issuer: &str, kid: &str) -> Option<Jwk> {
        let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = cache.get(issuer)?;
        if entry.fetched_at.elapsed() > JWKS_TTL {
            return None;
        }
        entry.keys.find(kid).cloned()
    }

    async fn fetch_jwks(&self, issuer: &str) -> Result<JwkSet, AuthressError> {
        let url = format!("{}{}", issuer.trim_end_matches('/'), JWKS_PATH);
        tracing::debug!(%url, "fetching signing keys");

        let fetch = async {
            self.http
                .get(&url)
                .send()
                .await?
                .error_for_status()?
                .json::<JwkSet>()
                .await
        };
        fetch
            .await
            .map_err(|e| AuthressError::token(format!("failed to fetch signing keys: {e}")))
    }
}

/// Read `iss` before the signature can be checked (the key depends on it).
fn unverified_issuer(token: &str) -> Result<String, AuthressError> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    jsonwebtoken::decode::<IssuerOnly>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims.iss)
        .map_err(|e| AuthressError::token(format!("unreadable claims: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access_key::test_keys;
    use chrono::Utc;
    use httpmock::prelude::*;
    use jsonwebtoken::{Algorithm, EncodingKey, Header};
    use serde_json::json;

    fn sign(kid: &str, claims: serde_json::Value) -> String {
        let mut header = Header::new(Algorithm::EdDSA);
        header.kid = Some(kid.to_string());
        let key = EncodingKey::from_ed_pem(test_keys::private_key_pem().as_bytes()).unwrap();
        jsonwebtoken::encode(&header, &claims, &key).unwrap()
    }

    fn jwks_body() -> serde_json::Value {
        json!({
            "keys": [{
                "kty": "OKP",
                "crv": "Ed25519",
                "x": test_keys::PUBLIC_KEY_X,
                "kid": "key-1",
                "alg": "EdDSA",
                "use": "sig"
            }]
        })
    }

    fn claims(iss: &str, exp_offset: i64) -> serde_json::Value {
        let now = Utc::now().timestamp();
        json!({
            "sub": "user-1",
            "iss": iss,
            "aud": ["https://app.example.com", "acc_tenant1"],
            "iat": now,
            "exp": now + exp_offset,
        })
    }

    #[tokio::test]
    async fn valid_token_yields_identity_and_tenant() {
        let server = MockServer::start_async().await;
        let jwks = server
            .mock_async(|when, then| {
                when.method(GET).path(JWKS_PATH);
                then.status(200).json_body(jwks_body());
            })
            .await;

        let verifier = TokenVerifier::new(&server.base_url(), reqwest::Client::new());
        let token = sign("key-1", claims(&server.base_url(), 600));

        let identity = verifier.verify(&token).await.unwrap();
        assert_eq!(identity.user_id.as_str(), "user-1");
        assert_eq!(identity.tenant_id.unwrap().as_str(), "acc_tenant1");

        // Second verification is served from the key cache.
        verifier.verify(&token).await.unwrap();
        jwks.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn foreign_issuer_is_rejected_without_fetching_keys() {
        let server = MockServer::start_async().await;
        let jwks = server
            .mock_async(|when, then| {
                when.method(GET).path(JWKS_PATH);
                then.status(200).json_body(jwks_body());
            })
            .await;

        let verifier = TokenVerifier::new(&server.base_url(), reqwest::Client::new());
        let token = sign("key-1", claims("https://evil.example.com", 600));

        let err = verifier.verify(&token).await.unwrap_err();
        assert_eq!(err.code(), "TokenVerificationError");
        jwks.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn unknown_kid_and_expired_tokens_fail() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(JWKS_PATH);
                then.status(200).json_body(jwks_body());
            })
            .await;
        let verifier = TokenVerifier::new(&server.base_url(), reqwest::Client::new());

        let wrong_kid = sign("key-2", claims(&server.base_url(), 600));
        assert!(verifier.verify(&wrong_kid).await.is_err());

        let expired = sign("key-1", claims(&server.base_url(), -3600));
        assert!(verifier.verify(&expired).await.is_err());
    }

    #[test]
    fn service_client_issuers_under_the_domain_are_trusted() {
        let verifier = TokenVerifier::new("https://auth.example.com/", reqwest::Client::new());
        assert!(verifier.is_trusted_issuer("https://auth.example.com"));
        assert!(verifier.is_trusted_issuer("https://auth.example.com/v1/clients/sc_1"));
        assert!(!verifier.is_trusted_issuer("https://auth.example.com.evil.io"));
        assert!(!verifier.is_trusted_issuer("garbage"));
    }

    #[tokio::test]
    async fn garbage_token_is_a_verification_error() {
        let verifier = TokenVerifier::new("https://auth.example.com", reqwest::Client::new());
        let err = verifier.verify("not-a-jwt").await.unwrap_err();
        assert!(matches!(err, AuthressError::TokenVerification { .. }));
    }
}
