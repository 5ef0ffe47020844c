//! Route protection from an explicit, per-request session context
//!
//! The caller resolves the session for the request (from a cookie, a
//! header, whatever the auth provider hands out) and passes it in; nothing
//! here reads or stores global state.

use std::time::SystemTime;

/// Path the user is sent to when sign-in is required
pub const LOGIN_PATH: &str = "/login";

/// Where signed-in users land when they open the login page
pub const HOME_PATH: &str = "/dashboard";

/// An authenticated session as reported by the auth provider
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub expires_at: SystemTime,
}

impl Session {
    pub fn is_active_at(&self, now: SystemTime) -> bool {
        now < self.expires_at
    }
}

/// Everything the access check needs to know about one request
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub path: String,
    pub session: Option<Session>,
    pub now: SystemTime,
}

impl RequestContext {
    pub fn new(path: impl Into<String>, session: Option<Session>) -> Self {
        Self {
            path: path.into(),
            session,
            now: SystemTime::now(),
        }
    }

    fn signed_in(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_active_at(self.now))
    }
}

/// Which paths need a session
#[derive(Debug, Clone)]
pub struct AccessRules {
    pub protected_prefixes: Vec<String>,
}

impl Default for AccessRules {
    fn default() -> Self {
        Self {
            protected_prefixes: vec!["/dashboard".to_string(), "/tools".to_string()],
        }
    }
}

impl AccessRules {
    fn is_protected(&self, path: &str) -> bool {
        self.protected_prefixes.iter().any(|prefix| {
            path == prefix
                || path
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

/// Outcome of the access check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Allow,
    Redirect(String),
}

/// Decide whether the request may proceed
///
/// Protected paths without an active session redirect to the login page,
/// carrying the original path in `next`. Signed-in users opening the login
/// page are sent home.
pub fn check_access(ctx: &RequestContext, rules: &AccessRules) -> Access {
    let signed_in = ctx.signed_in();

    if ctx.path == LOGIN_PATH && signed_in {
        return Access::Redirect(HOME_PATH.to_string());
    }
    if rules.is_protected(&ctx.path) && !signed_in {
        return Access::Redirect(format!("{}?next={}", LOGIN_PATH, encode_query_value(&ctx.path)));
    }
    Access::Allow
}

/// Percent-encode everything but unreserved characters and `/`
fn encode_query_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn session(valid_for: i64) -> Session {
        let now = SystemTime::now();
        let expires_at = if valid_for >= 0 {
            now + Duration::from_secs(valid_for as u64)
        } else {
            now - Duration::from_secs(valid_for.unsigned_abs())
        };
        Session { user_id: "user-1".to_string(), expires_at }
    }

    #[test]
    fn test_protected_route_requires_session() {
        let rules = AccessRules::default();
        let ctx = RequestContext::new("/tools/merge", None);
        assert_eq!(
            check_access(&ctx, &rules),
            Access::Redirect("/login?next=/tools/merge".to_string())
        );

        let ctx = RequestContext::new("/tools/merge", Some(session(3600)));
        assert_eq!(check_access(&ctx, &rules), Access::Allow);
    }

    #[test]
    fn test_expired_session_is_signed_out() {
        let ctx = RequestContext::new("/dashboard", Some(session(-60)));
        assert!(matches!(check_access(&ctx, &AccessRules::default()), Access::Redirect(_)));
    }

    #[test]
    fn test_prefix_matches_whole_segments() {
        let rules = AccessRules::default();
        assert_eq!(check_access(&RequestContext::new("/toolshed", None), &rules), Access::Allow);
        assert_eq!(check_access(&RequestContext::new("/", None), &rules), Access::Allow);
    }

    #[test]
    fn test_login_page_redirects_signed_in_users() {
        let ctx = RequestContext::new("/login", Some(session(3600)));
        assert_eq!(
            check_access(&ctx, &AccessRules::default()),
            Access::Redirect("/dashboard".to_string())
        );
        assert_eq!(
            check_access(&RequestContext::new("/login", None), &AccessRules::default()),
            Access::Allow
        );
    }

    #[test]
    fn test_next_is_encoded() {
        assert_eq!(encode_query_value("/tools/a b?x=1"), "/tools/a%20b%3Fx%3D1");
    }
}
