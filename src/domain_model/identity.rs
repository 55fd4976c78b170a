use super::{Claim, EXPIRATION_CLAIM, EXPIRY_CLAIM, IdentityOptions, NOT_BEFORE_CLAIM};
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("malformed token: {0}")]
    Malformed(String),
}

/// The parsed, validity-checked view of a signed token.
///
/// Built once and never mutated; a new login produces a new identity. Parsing never
/// fails outright: a token that cannot be decoded yields an identity carrying
/// [`IdentityError`] that is never authenticated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppIdentity {
    token: Option<String>,
    claims: Vec<Claim>,
    valid_from: Option<DateTime<Utc>>,
    valid_to: Option<DateTime<Utc>>,
    error: Option<IdentityError>,
    options: IdentityOptions,
}

impl AppIdentity {
    /// Decodes `token` without verifying its signature.
    pub fn parse(token: Option<&str>, options: &IdentityOptions) -> Self {
        let mut identity = Self {
            options: options.clone(),
            ..Self::default()
        };
        let Some(token) = token.filter(|t| !t.trim().is_empty()) else {
            return identity;
        };
        identity.token = Some(token.to_string());

        match decode_claims(token) {
            Ok(map) => {
                identity.valid_from = timestamp_claim(&map, NOT_BEFORE_CLAIM);
                identity.valid_to = timestamp_claim(&map, EXPIRY_CLAIM);
                identity.claims = Claim::from_json_map(&map);
            }
            Err(e) => identity.error = Some(e),
        }
        identity
    }

    /// An identity that is not backed by a token, e.g. a Basic-Auth principal.
    pub fn from_claims(claims: Vec<Claim>, options: &IdentityOptions) -> Self {
        Self {
            claims,
            options: options.clone(),
            ..Self::default()
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    pub fn valid_from(&self) -> Option<DateTime<Utc>> {
        self.valid_from
    }

    pub fn valid_to(&self) -> Option<DateTime<Utc>> {
        self.valid_to
    }

    pub fn error(&self) -> Option<&IdentityError> {
        self.error.as_ref()
    }

    pub fn options(&self) -> &IdentityOptions {
        &self.options
    }

    pub fn authentication_type(&self) -> &str {
        &self.options.authentication_type
    }

    pub fn find_first(&self, claim_type: &str) -> Option<&Claim> {
        self.claims.iter().find(|c| c.claim_type == claim_type)
    }

    pub fn name(&self) -> Option<&str> {
        self.find_first(&self.options.name_claim)
            .map(|c| c.value.as_str())
            .filter(|name| !name.trim().is_empty())
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.claims
            .iter()
            .filter(|c| c.claim_type == self.options.role_claim)
            .map(|c| c.value.as_str())
    }

    pub fn is_in_role(&self, role: &str) -> bool {
        self.roles().any(|r| r == role)
    }

    /// The `exp` claim, falling back to `expiration`.
    pub fn expiry_claim(&self) -> Option<&Claim> {
        self.find_first(EXPIRY_CLAIM)
            .or_else(|| self.find_first(EXPIRATION_CLAIM))
    }

    /// Expiry claim as a UTC instant: epoch seconds or RFC 3339. `None` when absent or
    /// unparseable.
    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        let value = self.expiry_claim()?.value.trim();
        match value.parse::<f64>() {
            Ok(seconds) => DateTime::from_timestamp(seconds.floor() as i64, 0),
            Err(_) => DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|at| at.with_timezone(&Utc)),
        }
    }

    /// `valid_from <= now < valid_to`; a missing bound is unconstrained.
    pub fn has_valid_dates_at(&self, now: DateTime<Utc>) -> bool {
        self.valid_from.is_none_or(|from| now >= from) && self.valid_to.is_none_or(|to| now < to)
    }

    pub fn has_valid_dates(&self) -> bool {
        self.has_valid_dates_at(Utc::now())
    }

    pub fn is_authenticated_at(&self, now: DateTime<Utc>) -> bool {
        self.error.is_none()
            && !self.options.authentication_type.is_empty()
            && self.name().is_some()
            && self.has_valid_dates_at(now)
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated_at(Utc::now())
    }
}

fn decode_claims(token: &str) -> Result<Map<String, Value>, IdentityError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = decode::<Map<String, Value>>(token, &DecodingKey::from_secret(&[]), &validation)
        .map_err(|e| IdentityError::Malformed(e.to_string()))?;
    Ok(data.claims)
}

// Numeric dates are seconds since the epoch; anything at or below the zero sentinel is ignored.
fn timestamp_claim(map: &Map<String, Value>, key: &str) -> Option<DateTime<Utc>> {
    let seconds = match map.get(key)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.floor() as i64))?,
        Value::String(s) => s.trim().parse::<f64>().ok()?.floor() as i64,
        _ => return None,
    };
    if seconds <= 0 {
        return None;
    }
    DateTime::from_timestamp(seconds, 0)
}
