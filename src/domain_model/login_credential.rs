use serde::Deserialize;
use std::fmt;

#[derive(Clone, Default, Deserialize)]
#[cfg_attr(test, derive(PartialEq))]
pub struct LoginCredential {
    pub username: String,
    pub password: String,
}

impl LoginCredential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

// Keep passwords out of logs.
impl fmt::Debug for LoginCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredential")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}
