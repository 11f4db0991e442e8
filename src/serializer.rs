//! Response Serializer
//!
//! Allow-list projection applied to every identity leaving the service. Only the
//! listed fields survive; the stored credential never does.

use crate::error::AuthError;

use axum::Json;
use serde::Serialize;
use serde_json::{Map, Value};

/// Fields of an identity that clients may see
pub const PUBLIC_IDENTITY_FIELDS: &[&str] = &["id", "email"];

/// Projects outbound values onto a fixed set of fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSerializer {
    fields: Vec<String>,
}

impl ResponseSerializer {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Serializer for public identity output
    pub fn identity() -> Self {
        Self::new(PUBLIC_IDENTITY_FIELDS.iter().copied())
    }

    /// Serialize `value` and keep only the allowed fields
    ///
    /// Objects are filtered, arrays are filtered element by element, and anything
    /// else (including `null`) passes through.
    pub fn project<T: Serialize + ?Sized>(&self, value: &T) -> Result<Value, AuthError> {
        let value = serde_json::to_value(value).map_err(|e| {
            tracing::error!("Response serialization failed: {}", e);
            AuthError::Internal
        })?;
        Ok(self.project_value(value))
    }

    /// [`project`](Self::project) wrapped as a JSON response body
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) -> Result<Json<Value>, AuthError> {
        self.project(value).map(Json)
    }

    fn project_value(&self, value: Value) -> Value {
        match value {
            Value::Object(object) => Value::Object(self.project_object(object)),
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| match item {
                        Value::Object(object) => Value::Object(self.project_object(object)),
                        other => other,
                    })
                    .collect(),
            ),
            other => other,
        }
    }

    fn project_object(&self, mut object: Map<String, Value>) -> Map<String, Value> {
        let mut projected = Map::new();
        for field in &self.fields {
            if let Some(value) = object.remove(field) {
                projected.insert(field.clone(), value);
            }
        }
        projected
    }
}

impl Default for ResponseSerializer {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Identity;
    use serde_json::json;

    fn identity(id: i64, email: &str) -> Identity {
        Identity {
            id,
            email: email.into(),
            credential: "deadbeef.0011".parse().unwrap(),
        }
    }

    #[test]
    fn test_single_identity_keeps_only_allowed_fields() {
        let projected = ResponseSerializer::identity()
            .project(&identity(1, "foo@bar.com"))
            .unwrap();

        assert_eq!(projected, json!({ "id": 1, "email": "foo@bar.com" }));
        assert!(projected.get("credential").is_none());
    }

    #[test]
    fn test_sequence_is_projected_in_order() {
        let identities = vec![identity(1, "a@bar.com"), identity(2, "b@bar.com")];
        let projected = ResponseSerializer::identity().project(&identities).unwrap();

        assert_eq!(
            projected,
            json!([
                { "id": 1, "email": "a@bar.com" },
                { "id": 2, "email": "b@bar.com" }
            ])
        );
    }

    #[test]
    fn test_absent_identity_is_null() {
        let none: Option<Identity> = None;
        let projected = ResponseSerializer::identity().project(&none).unwrap();
        assert_eq!(projected, Value::Null);

        let some = Some(identity(4, "x@bar.com"));
        let projected = ResponseSerializer::identity().project(&some).unwrap();
        assert_eq!(projected, json!({ "id": 4, "email": "x@bar.com" }));
    }

    #[test]
    fn test_never_leaks_credential_for_arbitrary_input() {
        let serializer = ResponseSerializer::identity();
        let inputs = [
            json!({ "id": 1, "email": "a", "credential": "aa.bb", "password": "x" }),
            json!({ "credential": "aa.bb" }),
            json!([{ "password": "x" }, { "id": 2, "credential": "cc.dd" }]),
            json!({ "id": 3, "email": "b", "extra": { "credential": "ee.ff" } }),
        ];

        for input in inputs {
            let out = serializer.project(&input).unwrap().to_string();
            assert!(!out.contains("credential"), "leaked in {out}");
            assert!(!out.contains("password"), "leaked in {out}");
        }
    }

    #[test]
    fn test_missing_fields_are_omitted() {
        let projected = ResponseSerializer::new(["id", "email", "name"])
            .project(&json!({ "id": 9 }))
            .unwrap();
        assert_eq!(projected, json!({ "id": 9 }));
    }
}
