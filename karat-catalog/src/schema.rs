//! Input validation and tolerant decoding of stored records.

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use karat_core::KaratError;

/// Field-keyed validation messages, rendered under `errors`.
#[derive(Debug, Default)]
pub struct SchemaErrors {
    map: Map<String, Value>,
}

impl SchemaErrors {
    pub fn push_schema(&mut self, msg: impl Into<String>) {
        self.push_field("_schema", msg);
    }

    pub fn push_field(&mut self, field: &str, msg: impl Into<String>) {
        let msg = Value::String(msg.into());
        match self.map.get_mut(field) {
            Some(Value::Array(list)) => list.push(msg),
            _ => {
                self.map.insert(field.to_string(), Value::Array(vec![msg]));
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn into_unprocessable_anyhow(self, message: &str) -> anyhow::Error {
        KaratError::unprocessable(message)
            .with_errors(Value::Object(self.map))
            .into_anyhow()
    }
}

fn friendly_message(code: &str) -> Option<&'static str> {
    match code {
        "required" => Some("is required"),
        "length" => Some("has invalid length"),
        "range" => Some("is out of range"),
        _ => None,
    }
}

fn collect(out: &mut SchemaErrors, prefix: &str, errs: &ValidationErrors) {
    for (field, kind) in errs.errors() {
        let key = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                for e in list {
                    let msg = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .or_else(|| friendly_message(&e.code).map(str::to_string))
                        .unwrap_or_else(|| e.code.to_string());
                    out.push_field(&key, msg);
                }
            }
            ValidationErrorsKind::Struct(nested) => collect(out, &key, nested),
            ValidationErrorsKind::List(items) => {
                for (idx, nested) in items {
                    collect(out, &format!("{key}[{idx}]"), nested);
                }
            }
        }
    }
}

/// Run the derived validation rules, mapping failures to `Unprocessable`.
pub fn check<T: Validate>(value: &T, error_message: &str) -> anyhow::Result<()> {
    value.validate().map_err(|e| {
        let mut out = SchemaErrors::default();
        collect(&mut out, "", &e);
        out.into_unprocessable_anyhow(error_message)
    })
}

/// Parse a JSON payload into `T` and validate it.
pub fn validate<T>(data: Value, error_message: &str) -> anyhow::Result<T>
where
    T: DeserializeOwned + Validate,
{
    let parsed: T = serde_json::from_value(data).map_err(|e| {
        KaratError::unprocessable(error_message)
            .with_errors(json!({ "_schema": [e.to_string()] }))
            .into_anyhow()
    })?;
    check(&parsed, error_message)?;
    Ok(parsed)
}

/// Deserializers for documents written by older clients, where a field
/// may hold a string, a number or nothing at all.
pub mod lenient {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn render(v: Value) -> Option<String> {
        match v {
            Value::Null => None,
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            other => Some(other.to_string()),
        }
    }

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(render(Value::deserialize(d)?).unwrap_or_default())
    }

    pub fn opt_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(render(Value::deserialize(d)?))
    }

    fn read_number<E: Error>(v: Value) -> Result<Option<f64>, E> {
        match v {
            Value::Null => Ok(None),
            Value::Number(n) => n
                .as_f64()
                .map(Some)
                .ok_or_else(|| E::custom("number out of range")),
            Value::String(s) if s.trim().is_empty() => Ok(None),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Some)
                .ok_or_else(|| E::custom(format!("'{s}' is not a number"))),
            other => Err(E::custom(format!("expected a number, got {other}"))),
        }
    }

    /// A number, or a string holding one. Blank and null read as zero.
    pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(read_number::<D::Error>(Value::deserialize(d)?)?.unwrap_or(0.0))
    }

    /// Like [`number`], but blank and null read as absent.
    pub fn opt_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        read_number(Value::deserialize(d)?)
    }

    /// Like [`number`], but blank and null are rejected. Pair with no
    /// `default` so a missing field is rejected too.
    pub fn required_number<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        read_number::<D::Error>(Value::deserialize(d)?)?
            .ok_or_else(|| D::Error::custom("amount is required"))
    }

    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        match Value::deserialize(d)? {
            Value::Bool(b) => Ok(b),
            Value::String(s) => Ok(matches!(s.trim(), "true" | "1" | "yes")),
            Value::Number(n) => Ok(n.as_f64().is_some_and(|n| n != 0.0)),
            _ => Ok(true),
        }
    }
}
