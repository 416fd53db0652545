use axum_extra::extract::cookie::Cookie;
use axum_extra::extract::SignedCookieJar;
use uuid::Uuid;

use crate::CookieSettings;

/// Create session cookie.
pub(super) fn session_cookie(settings: &CookieSettings, session_id: &str) -> Cookie<'static> {
    let builder = Cookie::build((settings.name.clone(), session_id.to_owned()))
        .http_only(true)
        .secure(settings.secure)
        .same_site(settings.same_site)
        .path("/");
    match &settings.domain {
        Some(domain) => builder.domain(domain.clone()).build(),
        None => builder.build(),
    }
}

/// Session id carried by a validly signed cookie.
pub(super) fn session_id(jar: &SignedCookieJar, settings: &CookieSettings) -> Option<String> {
    jar.get(&settings.name)
        .map(|c| c.value().to_owned())
        .filter(|id| !id.is_empty())
}

/// Existing session id, or a fresh one with its cookie added to the jar.
pub(super) fn ensure_session(
    jar: SignedCookieJar,
    settings: &CookieSettings,
) -> (SignedCookieJar, String) {
    match session_id(&jar, settings) {
        Some(id) => (jar, id),
        None => {
            let id = Uuid::new_v4().to_string();
            let jar = jar.add(session_cookie(settings, &id));
            (jar, id)
        }
    }
}
