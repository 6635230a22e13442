// Users and login credentials

use multitenancy_core::store::{Record, value_as_key};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Trait for authenticated users
pub trait AuthUser: Send + Sync {
    /// Column holding the user identifier
    fn auth_identifier_name(&self) -> &str {
        "id"
    }

    /// User identifier
    fn auth_identifier(&self) -> Option<String>;

    /// Stored password hash
    fn auth_password(&self) -> Option<&str>;
}

/// A user backed by a plain record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericUser {
    attributes: Record,
}

impl GenericUser {
    pub fn new(attributes: Record) -> Self {
        Self { attributes }
    }

    /// Get a raw attribute
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    pub fn attributes(&self) -> &Record {
        &self.attributes
    }
}

impl AuthUser for GenericUser {
    fn auth_identifier(&self) -> Option<String> {
        self.attributes
            .get(self.auth_identifier_name())
            .and_then(value_as_key)
    }

    fn auth_password(&self) -> Option<&str> {
        self.get_str("password")
    }
}

/// Credentials presented at login
///
/// Any field whose name contains `password` is checked against the stored
/// hash; the rest narrow the lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Credentials {
    fields: Record,
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// The plain-text password, if presented
    pub fn password(&self) -> Option<&str> {
        self.fields.get("password").and_then(Value::as_str)
    }

    /// Fields used to look the user up
    pub fn lookup_fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter().filter(|(key, _)| !key.contains("password"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_generic_user() {
        let record = json!({"id": 5, "email": "a@acme.test", "password": "$argon2id$..."});
        let user = GenericUser::new(record.as_object().cloned().unwrap());

        assert_eq!(user.auth_identifier(), Some("5".to_string()));
        assert_eq!(user.auth_password(), Some("$argon2id$..."));
        assert_eq!(user.get_str("email"), Some("a@acme.test"));
    }

    #[test]
    fn test_credentials_lookup_fields() {
        let credentials = Credentials::new()
            .with("email", "a@acme.test")
            .with("password", "secret")
            .with("password_confirmation", "secret");

        assert_eq!(credentials.password(), Some("secret"));

        let fields: Vec<&str> = credentials.lookup_fields().map(|(k, _)| k.as_str()).collect();
        assert_eq!(fields, vec!["email"]);
    }
}
