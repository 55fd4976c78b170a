use crate::domain_model::*;
use crate::domain_port::BasicAuthenticator;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::sync::Arc;
use warp::path::FullPath;
use warp::{Filter, Rejection, reject};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialFormatError {
    #[error("authorization scheme is not Basic")]
    NotBasic,
    #[error("credentials are not valid base64")]
    Encoding,
    #[error("credentials are not valid UTF-8")]
    Utf8,
    #[error("credentials must have the form user:password")]
    Separator,
}

/// Rejection raised by [`with_basic_auth`]; `realm` is set when the client should be
/// challenged.
#[derive(Debug)]
pub struct Unauthorized {
    pub realm: Option<String>,
    pub reason: String,
}

impl reject::Reject for Unauthorized {}

/// Parses `Basic <base64(user:pass)>`. The scheme is case-insensitive and the decoded
/// text must contain exactly one `:`.
pub fn parse_basic_header(header: &str) -> Result<LoginCredential, CredentialFormatError> {
    let (scheme, encoded) = header
        .trim()
        .split_once(' ')
        .ok_or(CredentialFormatError::NotBasic)?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return Err(CredentialFormatError::NotBasic);
    }

    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|_| CredentialFormatError::Encoding)?;
    let text = String::from_utf8(bytes).map_err(|_| CredentialFormatError::Utf8)?;
    if text.matches(':').count() != 1 {
        return Err(CredentialFormatError::Separator);
    }
    let (username, password) = text
        .split_once(':')
        .ok_or(CredentialFormatError::Separator)?;
    Ok(LoginCredential::new(username, password))
}

/// Extracts the request principal. Paths the authenticator exempts pass through with an
/// anonymous identity.
pub fn with_basic_auth(
    authenticator: Arc<dyn BasicAuthenticator>,
    port: u16,
    realm: String,
) -> impl Filter<Extract = (Arc<AppIdentity>,), Error = Rejection> + Clone {
    warp::path::full()
        .and(warp::header::optional::<String>("authorization"))
        .and_then(move |path: FullPath, header: Option<String>| {
            let authenticator = authenticator.clone();
            let realm = realm.clone();
            async move {
                authenticate(authenticator.as_ref(), port, path.as_str(), header.as_deref())
                    .await
                    .map(Arc::new)
                    .map_err(|reason| {
                        tracing::debug!(path = path.as_str(), reason, "basic authentication failed");
                        let realm = authenticator.is_challenge_required(port).then_some(realm);
                        reject::custom(Unauthorized {
                            realm,
                            reason: reason.to_string(),
                        })
                    })
            }
        })
}

async fn authenticate(
    authenticator: &dyn BasicAuthenticator,
    port: u16,
    path: &str,
    header: Option<&str>,
) -> Result<AppIdentity, &'static str> {
    let Some(header) = header else {
        if !authenticator.is_authentication_required(path) {
            return Ok(AppIdentity::default());
        }
        return Err("missing authorization header");
    };

    let credential = parse_basic_header(header).map_err(|e| match e {
        CredentialFormatError::Separator => "invalid credentials format",
        _ => "invalid authorization header",
    })?;

    if authenticator
        .is_authenticated(&credential.username, &credential.password)
        .await
    {
        tracing::trace!(username = %credential.username, port, "basic authentication succeeded");
        Ok(AppIdentity::from_claims(
            vec![Claim::new(DEFAULT_NAME_CLAIM, credential.username)],
            &IdentityOptions::default().with_authentication_type("Basic"),
        ))
    } else {
        Err("invalid username or password")
    }
}
