use serde::Deserialize;

pub const DEFAULT_AUTHENTICATION_TYPE: &str = "AppIdentity";
pub const DEFAULT_NAME_CLAIM: &str = "name";
pub const DEFAULT_ROLE_CLAIM: &str = "role";

/// Which claim keys carry the principal name and roles.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IdentityOptions {
    pub authentication_type: String,
    pub name_claim: String,
    pub role_claim: String,
}

impl Default for IdentityOptions {
    fn default() -> Self {
        Self {
            authentication_type: DEFAULT_AUTHENTICATION_TYPE.to_string(),
            name_claim: DEFAULT_NAME_CLAIM.to_string(),
            role_claim: DEFAULT_ROLE_CLAIM.to_string(),
        }
    }
}

impl IdentityOptions {
    pub fn with_authentication_type(mut self, authentication_type: impl Into<String>) -> Self {
        self.authentication_type = authentication_type.into();
        self
    }

    pub fn with_name_claim(mut self, name_claim: impl Into<String>) -> Self {
        self.name_claim = name_claim.into();
        self
    }

    pub fn with_role_claim(mut self, role_claim: impl Into<String>) -> Self {
        self.role_claim = role_claim.into();
        self
    }
}
