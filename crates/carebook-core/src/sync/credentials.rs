//! Bearer token source.

use super::{SyncError, SyncResult};

/// Hands the engine a bearer token. Sign-in happens elsewhere.
pub trait CredentialProvider {
    fn access_token(&self) -> SyncResult<String>;
}

/// A token obtained up front by the caller.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticToken(..)")
    }
}

impl CredentialProvider for StaticToken {
    fn access_token(&self) -> SyncResult<String> {
        let token = self.0.trim();
        if token.is_empty() {
            return Err(SyncError::Auth("no access token".to_string()));
        }
        Ok(token.to_string())
    }
}
