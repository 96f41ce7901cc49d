//! Rate limit key construction.

use serde::Serialize;

/// A key identifying who is being throttled for which action.
///
/// Keys are opaque strings to the limiter; `scoped` gives callers a
/// consistent `"scope:id"` shape so that e.g. a login lockout for an email
/// never collides with an upload quota for the same user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct LimitKey(String);

impl LimitKey {
    /// Build a `"{scope}:{id}"` key.
    pub fn scoped(scope: &str, id: &str) -> Self {
        Self(format!("{}:{}", scope, id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for LimitKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LimitKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
