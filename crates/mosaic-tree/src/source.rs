//! Typed prop sources
//!
//! A [`PropSource`] declares where a component input's value comes from: a
//! literal ([`PropSource::Static`]), a path into structured data
//! ([`PropSource::Dynamic`]), or an adapter computation over further prop
//! sources ([`PropSource::Adapted`]). The sum type is closed and matched
//! exhaustively wherever sources are interpreted; the wire format carries a
//! `sourceType` discriminator (`static:<field_type>`, `dynamic`, `adapted`).

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::TreeError;

/// Maximum supported prop-source nesting depth
pub const MAX_SOURCE_DEPTH: usize = 32;

/// Origin of a component input value
#[derive(Debug, Clone, PartialEq)]
pub enum PropSource {
    /// A literal value typed by a field type
    Static {
        /// The literal value
        value: Value,
        /// Field type name governing canonical casts (`string`, `boolean`, ...)
        field_type: String,
        /// Source expression the value was authored against
        expression: String,
        /// Server-resolved value cache; stripped during canonicalization
        cached_resolution: Option<Value>,
    },

    /// A path into structured data, resolved at render time
    Dynamic {
        /// The data path expression
        expression: String,
    },

    /// An adapter computation over further prop sources
    Adapted {
        /// Registered adapter id
        adapter_id: String,
        /// Named inputs feeding the adapter
        adapter_inputs: IndexMap<String, PropSource>,
    },
}

impl PropSource {
    /// Shorthand for a static source with no resolution cache
    #[inline]
    #[must_use]
    pub fn literal(
        value: Value,
        field_type: impl Into<String>,
        expression: impl Into<String>,
    ) -> Self {
        Self::Static {
            value,
            field_type: field_type.into(),
            expression: expression.into(),
            cached_resolution: None,
        }
    }

    /// Shorthand for a dynamic source
    #[inline]
    #[must_use]
    pub fn dynamic(expression: impl Into<String>) -> Self {
        Self::Dynamic {
            expression: expression.into(),
        }
    }

    /// Verify the adapter graph is acyclic and within the depth bound
    ///
    /// Owned nesting cannot form reference cycles, so the check guards the
    /// one representable failure: an adapter id recurring inside its own
    /// input chain (its inputs would then reference its own output).
    ///
    /// # Errors
    /// Returns [`TreeError::AdapterCycle`] or
    /// [`TreeError::SourceDepthExceeded`].
    pub fn assert_acyclic(&self) -> Result<(), TreeError> {
        fn walk<'a>(
            source: &'a PropSource,
            chain: &mut Vec<&'a str>,
        ) -> Result<(), TreeError> {
            if chain.len() >= MAX_SOURCE_DEPTH {
                return Err(TreeError::SourceDepthExceeded {
                    max: MAX_SOURCE_DEPTH,
                });
            }
            if let PropSource::Adapted {
                adapter_id,
                adapter_inputs,
            } = source
            {
                if chain.contains(&adapter_id.as_str()) {
                    return Err(TreeError::AdapterCycle(adapter_id.clone()));
                }
                chain.push(adapter_id);
                for input in adapter_inputs.values() {
                    walk(input, chain)?;
                }
                chain.pop();
            }
            Ok(())
        }

        walk(self, &mut Vec::new())
    }

    /// Rewrite UUID references after a subtree copy
    ///
    /// Expressions may embed node UUIDs; when a subtree is duplicated each
    /// copied node gets a fresh identity and every reference to an old UUID
    /// inside the copied sources must follow.
    pub fn remap_uuids(&mut self, mapping: &HashMap<Uuid, Uuid>) {
        match self {
            Self::Static { expression, .. } | Self::Dynamic { expression } => {
                for (old, new) in mapping {
                    if expression.contains(&old.to_string()) {
                        *expression = expression.replace(&old.to_string(), &new.to_string());
                    }
                }
            }
            Self::Adapted { adapter_inputs, .. } => {
                for input in adapter_inputs.values_mut() {
                    input.remap_uuids(mapping);
                }
            }
        }
    }

    /// Canonical JSON representation used for hashing
    ///
    /// Applies the optimize-inputs rules: the resolution cache is stripped,
    /// typed scalars are cast to their canonical primitive, and a static
    /// source whose value equals its field type's canonical default
    /// collapses to the minimal (expression-only) form. Composite output
    /// uses sorted-key maps.
    #[must_use]
    pub fn canonical_value(&self) -> Value {
        match self {
            Self::Static {
                value,
                field_type,
                expression,
                cached_resolution: _,
            } => {
                let cast = cast_scalar(value, field_type);
                let mut map = Map::new();
                map.insert(
                    "sourceType".to_string(),
                    Value::String(format!("static:{field_type}")),
                );
                map.insert("expression".to_string(), Value::String(expression.clone()));
                if cast != canonical_default(field_type) || expression.is_empty() {
                    map.insert("value".to_string(), cast);
                }
                Value::Object(map)
            }
            Self::Dynamic { expression } => {
                let mut map = Map::new();
                map.insert("sourceType".to_string(), Value::String("dynamic".to_string()));
                map.insert("expression".to_string(), Value::String(expression.clone()));
                Value::Object(map)
            }
            Self::Adapted {
                adapter_id,
                adapter_inputs,
            } => {
                let mut inputs = Map::new();
                for (name, input) in adapter_inputs {
                    inputs.insert(name.clone(), input.canonical_value());
                }
                let mut map = Map::new();
                map.insert("sourceType".to_string(), Value::String("adapted".to_string()));
                map.insert("adapterId".to_string(), Value::String(adapter_id.clone()));
                map.insert("adapterInputs".to_string(), Value::Object(inputs));
                Value::Object(map)
            }
        }
    }
}

/// Canonical default value for a field type
#[must_use]
pub fn canonical_default(field_type: &str) -> Value {
    match field_type {
        "boolean" => Value::Bool(false),
        "integer" => Value::from(0),
        "number" => Value::from(0.0),
        "string" | "text" | "uri" => Value::String(String::new()),
        _ => Value::Null,
    }
}

/// Cast a scalar to the canonical primitive for its field type
///
/// Semantically identical values from different producers (a browser
/// payload carrying `"true"`, a server structure carrying `true`) must
/// normalize identically. Values that do not fit the field type are
/// passed through untouched.
#[must_use]
pub fn cast_scalar(value: &Value, field_type: &str) -> Value {
    match field_type {
        "boolean" => match value {
            Value::Bool(_) => value.clone(),
            Value::String(s) => match s.as_str() {
                "true" | "1" => Value::Bool(true),
                "false" | "0" | "" => Value::Bool(false),
                _ => value.clone(),
            },
            Value::Number(n) => Value::Bool(n.as_i64().is_some_and(|v| v != 0)),
            _ => value.clone(),
        },
        "integer" => match value {
            Value::Number(n) if n.is_i64() || n.is_u64() => value.clone(),
            Value::Number(n) => n
                .as_f64()
                .filter(|f| f.fract() == 0.0)
                .map_or_else(|| value.clone(), |f| Value::from(f as i64)),
            Value::String(s) => s
                .parse::<i64>()
                .map_or_else(|_| value.clone(), Value::from),
            _ => value.clone(),
        },
        "number" => match value {
            Value::Number(_) => value.clone(),
            Value::String(s) => s
                .parse::<f64>()
                .map_or_else(|_| value.clone(), Value::from),
            _ => value.clone(),
        },
        _ => value.clone(),
    }
}

/// Wire shape with the `sourceType` discriminator
#[derive(Serialize, Deserialize)]
struct RawPropSource {
    #[serde(rename = "sourceType")]
    source_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expression: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    resolved: Option<Value>,
    #[serde(
        rename = "adapterId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    adapter_id: Option<String>,
    #[serde(
        rename = "adapterInputs",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    adapter_inputs: Option<IndexMap<String, PropSource>>,
}

impl Serialize for PropSource {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let raw = match self {
            Self::Static {
                value,
                field_type,
                expression,
                cached_resolution,
            } => RawPropSource {
                source_type: format!("static:{field_type}"),
                value: Some(value.clone()),
                expression: Some(expression.clone()),
                resolved: cached_resolution.clone(),
                adapter_id: None,
                adapter_inputs: None,
            },
            Self::Dynamic { expression } => RawPropSource {
                source_type: "dynamic".to_string(),
                value: None,
                expression: Some(expression.clone()),
                resolved: None,
                adapter_id: None,
                adapter_inputs: None,
            },
            Self::Adapted {
                adapter_id,
                adapter_inputs,
            } => RawPropSource {
                source_type: "adapted".to_string(),
                value: None,
                expression: None,
                resolved: None,
                adapter_id: Some(adapter_id.clone()),
                adapter_inputs: Some(adapter_inputs.clone()),
            },
        };
        raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PropSource {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawPropSource::deserialize(deserializer)?;
        if let Some(field_type) = raw.source_type.strip_prefix("static:") {
            if field_type.is_empty() {
                return Err(D::Error::custom("static source with empty field type"));
            }
            return Ok(Self::Static {
                value: raw.value.unwrap_or(Value::Null),
                field_type: field_type.to_string(),
                expression: raw.expression.unwrap_or_default(),
                cached_resolution: raw.resolved,
            });
        }
        match raw.source_type.as_str() {
            "dynamic" => Ok(Self::Dynamic {
                expression: raw
                    .expression
                    .ok_or_else(|| D::Error::custom("dynamic source without expression"))?,
            }),
            "adapted" => Ok(Self::Adapted {
                adapter_id: raw
                    .adapter_id
                    .ok_or_else(|| D::Error::custom("adapted source without adapterId"))?,
                adapter_inputs: raw.adapter_inputs.unwrap_or_default(),
            }),
            other => Err(D::Error::custom(format!(
                "unknown prop source type: {other:?}"
            ))),
        }
    }
}
