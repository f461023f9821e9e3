use axum_extra::extract::cookie::{Cookie, SameSite};

use crate::config::GatewayConfig;

/// The credential cookie set after login and signup.
pub fn session_cookie(config: &GatewayConfig, token: String) -> Cookie<'static> {
    Cookie::build((config.cookie_name.clone(), token))
        .path("/")
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(config.token_ttl_secs as i64))
        .build()
}

/// An empty, already expired credential cookie that makes the browser drop it.
pub fn expired_cookie(config: &GatewayConfig) -> Cookie<'static> {
    Cookie::build((config.cookie_name.clone(), ""))
        .path("/")
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::ZERO)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_attributes() {
        let config = GatewayConfig {
            cookie_secure: true,
            ..GatewayConfig::default()
        };
        let cookie = session_cookie(&config, "abc".to_string());

        assert_eq!(cookie.name(), "jwt");
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(time::Duration::hours(2)));
    }

    #[test]
    fn expired_cookie_has_zero_max_age() {
        let cookie = expired_cookie(&GatewayConfig::default());

        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
        assert!(cookie.to_string().contains("Max-Age=0"));
    }
}
