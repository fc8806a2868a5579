use anyhow::Result;
use pasetors::claims::{Claims, ClaimsValidationRules};
use pasetors::keys::SymmetricKey;
use pasetors::token::UntrustedToken;
use pasetors::{local, version4::V4, Local};
use uuid::Uuid;

const TOKEN_ISSUER: &str = "mutuals";
const TOKEN_AUDIENCE: &str = "mutuals";
const ACCESS_TOKEN_TYPE: &str = "access";

/// PASETO v4.local access tokens shared with the identity provider.
#[derive(Clone)]
pub struct AccessTokens {
    key: [u8; 32],
    ttl_minutes: u64,
}

impl AccessTokens {
    pub fn new(key: [u8; 32], ttl_minutes: u64) -> Self {
        Self { key, ttl_minutes }
    }

    pub fn issue(&self, user_id: Uuid) -> Result<String> {
        let duration = std::time::Duration::from_secs(self.ttl_minutes * 60);
        let mut claims = Claims::new_expires_in(&duration)?;
        claims.issuer(TOKEN_ISSUER)?;
        claims.audience(TOKEN_AUDIENCE)?;
        claims.subject(&user_id.to_string())?;
        claims.add_additional("typ", ACCESS_TOKEN_TYPE)?;

        let key = SymmetricKey::<V4>::from(&self.key)?;
        Ok(local::encrypt(&key, &claims, None, None)?)
    }

    pub fn verify(&self, token: &str) -> Result<Option<Uuid>> {
        let key = SymmetricKey::<V4>::from(&self.key)?;
        let mut rules = ClaimsValidationRules::new();
        rules.validate_issuer_with(TOKEN_ISSUER);
        rules.validate_audience_with(TOKEN_AUDIENCE);

        let untrusted = match UntrustedToken::<Local, V4>::try_from(token) {
            Ok(token) => token,
            Err(_) => return Ok(None),
        };
        let trusted = match local::decrypt(&key, &untrusted, &rules, None, None) {
            Ok(token) => token,
            Err(_) => return Ok(None),
        };
        let Some(claims) = trusted.payload_claims() else {
            return Ok(None);
        };

        if !has_token_type(claims, ACCESS_TOKEN_TYPE) {
            return Ok(None);
        }
        Ok(claim_uuid(claims, "sub"))
    }
}

fn claim_uuid(claims: &Claims, name: &str) -> Option<Uuid> {
    claims
        .get_claim(name)
        .and_then(|value| value.as_str())
        .and_then(|value| Uuid::parse_str(value).ok())
}

fn has_token_type(claims: &Claims, expected: &str) -> bool {
    claims
        .get_claim("typ")
        .and_then(|value| value.as_str())
        .map(|value| value == expected)
        .unwrap_or(false)
}
