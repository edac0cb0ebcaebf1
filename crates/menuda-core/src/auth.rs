//! Sign-in glue: Google identity token → backend user → persisted profile

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;

use crate::client::BackendApi;
use crate::error::{CoreError, CoreResult};
use crate::models::{NewUser, UserProfile};
use crate::session::Session;

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    picture: String,
}

/// Read the identity claims from the payload segment of a JWT.
///
/// The signature is not checked here; the token comes straight from Google
/// Identity Services and the backend owns the user record.
pub fn decode_id_token(token: &str) -> CoreResult<NewUser> {
    let payload = token
        .trim()
        .split('.')
        .nth(1)
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| invalid("token has no payload segment"))?;

    // Accept both padded and unpadded base64url
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| invalid(&e.to_string()))?;
    let claims: IdTokenClaims =
        serde_json::from_slice(&bytes).map_err(|e| invalid(&e.to_string()))?;

    if claims.email.trim().is_empty() {
        return Err(invalid("token has no email claim"));
    }
    let name = if claims.name.trim().is_empty() {
        claims.email.clone()
    } else {
        claims.name
    };

    Ok(NewUser {
        name,
        email: claims.email,
        picture: claims.picture,
    })
}

fn invalid(message: &str) -> CoreError {
    CoreError::InvalidToken {
        message: message.to_string(),
    }
}

/// Decode the token, look the user up (or create it) and store the profile
pub async fn login(backend: &dyn BackendApi, session: &Session, token: &str) -> CoreResult<UserProfile> {
    let user = decode_id_token(token)?;
    log::info!("Signing in {}", user.email);
    let user_id = backend.check_user(&user).await?;
    let profile = user.into_profile(user_id);
    session.save_profile(&profile)?;
    Ok(profile)
}

/// Forget the stored profile
pub fn logout(session: &Session) -> CoreResult<()> {
    if let Some(profile) = session.profile()? {
        log::info!("Signing out {}", profile.email);
    }
    session.clear_profile()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{BackendCall, MemoryBackend};
    use base64::engine::general_purpose::URL_SAFE;

    fn token_with(claims: &str, padded: bool) -> String {
        let payload = if padded {
            URL_SAFE.encode(claims)
        } else {
            URL_SAFE_NO_PAD.encode(claims)
        };
        format!("eyJhbGciOiJSUzI1NiJ9.{}.signature", payload)
    }

    #[test]
    fn test_decode_id_token() {
        let token = token_with(
            r#"{"name":"Ana López","email":"ana@example.com","picture":"https://img/a.png","sub":"1"}"#,
            false,
        );
        let user = decode_id_token(&token).unwrap();
        assert_eq!(user.name, "Ana López");
        assert_eq!(user.email, "ana@example.com");
        assert_eq!(user.picture, "https://img/a.png");
    }

    #[test]
    fn test_decode_padded_token() {
        let token = token_with(r#"{"name":"Bo","email":"bo@example.com"}"#, true);
        let user = decode_id_token(&token).unwrap();
        assert_eq!(user.name, "Bo");
        assert_eq!(user.picture, "");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode_id_token("nodots"), Err(CoreError::InvalidToken { .. })));
        assert!(matches!(decode_id_token("a.!!!.c"), Err(CoreError::InvalidToken { .. })));
        let no_email = token_with(r#"{"name":"Bo"}"#, false);
        assert!(matches!(decode_id_token(&no_email), Err(CoreError::InvalidToken { .. })));
    }

    #[tokio::test]
    async fn test_login_persists_profile_and_logout_clears_it() {
        let backend = MemoryBackend::new().with_user_id("uuid-42");
        let session = Session::in_memory();
        let token = token_with(r#"{"name":"Ana López","email":"ana@example.com"}"#, false);

        let profile = login(&backend, &session, &token).await.unwrap();
        assert_eq!(profile.user_id, "uuid-42");
        assert_eq!(session.require_profile().unwrap(), profile);
        assert_eq!(
            backend.calls(),
            vec![BackendCall::CheckUser { email: "ana@example.com".to_string() }]
        );

        logout(&session).unwrap();
        assert!(!session.is_signed_in());
    }

    #[tokio::test]
    async fn test_bad_token_makes_no_backend_call() {
        let backend = MemoryBackend::new();
        let session = Session::in_memory();
        assert!(login(&backend, &session, "not-a-token").await.is_err());
        assert!(backend.calls().is_empty());
        assert!(!session.is_signed_in());
    }
}
