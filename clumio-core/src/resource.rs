//! Resource - Representing resources and their state

use std::collections::HashMap;

/// Unique identifier for a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId {
    /// Resource type (e.g., "protection_group", "aws_connection")
    pub resource_type: String,
    /// Resource name (local name given by the caller)
    pub name: String,
}

impl ResourceId {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.resource_type, self.name)
    }
}

/// Attribute value of a resource
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    Bool(bool),
    List(Vec<Value>),
    Map(HashMap<String, Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Build a list of strings
    pub fn string_list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::List(items.into_iter().map(|s| Value::String(s.into())).collect())
    }

    /// Collect the string items of a list, skipping anything else
    pub fn to_string_vec(&self) -> Option<Vec<String>> {
        self.as_list().map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
    }

    /// Convert a JSON value. `null` has no counterpart and yields `None`.
    /// Numbers must be 64-bit integers.
    pub fn from_json(value: &serde_json::Value) -> Result<Option<Value>, String> {
        let value = match value {
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => return Err(format!("{} is not a 64-bit integer", n)),
            },
            serde_json::Value::Array(arr) => {
                let mut items = Vec::with_capacity(arr.len());
                for item in arr {
                    items.extend(Value::from_json(item)?);
                }
                Value::List(items)
            }
            serde_json::Value::Object(obj) => {
                let mut map = HashMap::with_capacity(obj.len());
                for (key, item) in obj {
                    let item = Value::from_json(item).map_err(|e| format!("{}: {}", key, e))?;
                    if let Some(item) = item {
                        map.insert(key.clone(), item);
                    }
                }
                Value::Map(map)
            }
            serde_json::Value::Null => return Ok(None),
        };
        Ok(Some(value))
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

/// Convert an attribute map to a JSON object
pub fn attributes_to_json(attributes: &HashMap<String, Value>) -> serde_json::Value {
    serde_json::Value::Object(
        attributes
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect(),
    )
}

/// Desired state declared by the caller (plan or data source configuration)
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub id: ResourceId,
    pub attributes: HashMap<String, Value>,
    /// If true, this is a data source (read-only) that won't be modified
    pub read_only: bool,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ResourceId::new(resource_type, name),
            attributes: HashMap::new(),
            read_only: false,
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Returns true if this resource is a data source (read-only)
    pub fn is_data_source(&self) -> bool {
        self.read_only
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.attributes.get(key).and_then(Value::as_bool)
    }
}

/// Current state fetched from the backend
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub id: ResourceId,
    /// Backend identifier (connection id, protection group id, bucket id)
    pub identifier: Option<String>,
    pub attributes: HashMap<String, Value>,
    /// Whether this state exists
    pub exists: bool,
}

impl State {
    pub fn not_found(id: ResourceId) -> Self {
        Self {
            id,
            identifier: None,
            attributes: HashMap::new(),
            exists: false,
        }
    }

    pub fn existing(id: ResourceId, attributes: HashMap<String, Value>) -> Self {
        Self {
            id,
            identifier: None,
            attributes,
            exists: true,
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.attributes.get(key).and_then(Value::as_int)
    }

    /// JSON rendering used for output: identifier plus attributes
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "type": self.id.resource_type,
            "name": self.id.name,
            "identifier": self.identifier,
            "attributes": attributes_to_json(&self.attributes),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_conversion_drops_nulls() {
        let json = serde_json::json!({
            "name": "pg",
            "description": null,
            "version": 3,
            "object_filter": {"storage_classes": ["S3 Standard"], "latest_version_only": true}
        });
        let value = Value::from_json(&json).unwrap().unwrap();
        let map = value.as_map().unwrap();

        assert!(!map.contains_key("description"));
        assert_eq!(map.get("version"), Some(&Value::Int(3)));
        let filter = map.get("object_filter").and_then(Value::as_map).unwrap();
        assert_eq!(
            filter.get("storage_classes").and_then(Value::to_string_vec),
            Some(vec!["S3 Standard".to_string()])
        );
    }

    #[test]
    fn json_conversion_rejects_fractional_numbers() {
        let json = serde_json::json!({"object_filter": {"version": 1.5}});
        let err = Value::from_json(&json).unwrap_err();
        assert_eq!(err, "object_filter: version: 1.5 is not a 64-bit integer");

        let json = serde_json::json!([u64::MAX]);
        assert!(Value::from_json(&json).is_err());
    }

    #[test]
    fn value_to_json_nested() {
        let value = Value::Map(HashMap::from([(
            "prefix_filters".to_string(),
            Value::List(vec![Value::Map(HashMap::from([(
                "prefix".to_string(),
                Value::String("logs/".to_string()),
            )]))]),
        )]));
        assert_eq!(
            value.to_json(),
            serde_json::json!({"prefix_filters": [{"prefix": "logs/"}]})
        );
    }

    #[test]
    fn resource_id_display() {
        let id = ResourceId::new("protection_group", "main");
        assert_eq!(id.to_string(), "protection_group.main");
    }

    #[test]
    fn state_accessors() {
        let state = State::existing(
            ResourceId::new("protection_group", "main"),
            HashMap::from([
                ("name".to_string(), Value::String("pg".to_string())),
                ("version".to_string(), Value::Int(2)),
            ]),
        )
        .with_identifier("pg-1");

        assert_eq!(state.get_str("name"), Some("pg"));
        assert_eq!(state.get_int("version"), Some(2));
        assert_eq!(state.to_json()["identifier"], "pg-1");
    }
}
