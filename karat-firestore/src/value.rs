//! Conversion between plain JSON and Firestore's typed value encoding.
//!
//! Firestore wraps every value in a single-key object naming its type
//! (`{"stringValue": "x"}`, `{"integerValue": "42"}`, ...). Records in
//! Karat are plain JSON, so integers round-trip through
//! `integerValue`, other numbers through `doubleValue`, and
//! timestamps, references and bytes decode to strings.

use karat_core::store::{Document, Fields, StoreError, StoreResult};
use serde_json::{json, Map, Value};

pub fn encode_fields(fields: &Fields) -> Value {
    let encoded: Map<String, Value> = fields
        .iter()
        .map(|(k, v)| (k.clone(), encode_value(v)))
        .collect();
    Value::Object(encoded)
}

pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or_default() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

pub fn decode_fields(fields: &Map<String, Value>) -> StoreResult<Fields> {
    fields
        .iter()
        .map(|(k, v)| Ok((k.clone(), decode_value(v)?)))
        .collect()
}

pub fn decode_value(value: &Value) -> StoreResult<Value> {
    let obj = value
        .as_object()
        .ok_or_else(|| StoreError::decode(format!("expected typed value object, got {value}")))?;
    let (kind, inner) = obj
        .iter()
        .next()
        .ok_or_else(|| StoreError::decode("empty typed value"))?;

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => Ok(Value::Bool(inner.as_bool().unwrap_or(false))),
        "integerValue" => {
            // Sent as a decimal string, occasionally as a bare number.
            let parsed = match inner {
                Value::String(s) => s.parse::<i64>().ok(),
                Value::Number(n) => n.as_i64(),
                _ => None,
            };
            parsed
                .map(Value::from)
                .ok_or_else(|| StoreError::decode(format!("bad integerValue {inner}")))
        }
        "doubleValue" => match inner {
            Value::Number(_) => Ok(inner.clone()),
            // NaN and the infinities arrive as strings; JSON cannot hold them.
            Value::String(_) => Ok(Value::Null),
            _ => Err(StoreError::decode(format!("bad doubleValue {inner}"))),
        },
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => Ok(inner.clone()),
        "geoPointValue" => Ok(json!({
            "latitude": inner.get("latitude").cloned().unwrap_or(Value::from(0.0)),
            "longitude": inner.get("longitude").cloned().unwrap_or(Value::from(0.0)),
        })),
        "arrayValue" => {
            let items = inner
                .get("values")
                .and_then(|v| v.as_array())
                .map(|values| values.iter().map(decode_value).collect::<StoreResult<Vec<_>>>())
                .transpose()?
                .unwrap_or_default();
            Ok(Value::Array(items))
        }
        "mapValue" => {
            let fields = match inner.get("fields").and_then(|v| v.as_object()) {
                Some(fields) => decode_fields(fields)?,
                None => Fields::new(),
            };
            Ok(Value::Object(fields))
        }
        other => Err(StoreError::decode(format!("unsupported value type '{other}'"))),
    }
}

/// Decode a REST document resource (`{"name": ".../col/id", "fields": {...}}`).
pub fn decode_document(resource: &Value) -> StoreResult<Document> {
    let name = resource
        .get("name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| StoreError::decode("document resource has no name"))?;
    let id = name
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| StoreError::decode(format!("bad document name '{name}'")))?;

    let fields = match resource.get("fields").and_then(|v| v.as_object()) {
        Some(fields) => decode_fields(fields)?,
        None => Fields::new(),
    };
    Ok(Document::new(id, fields))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_records_encode_and_decode() {
        let record = json!({
            "mobile": "9000000001",
            "totalEarning": 1500,
            "ratio": 0.25,
            "active": true,
            "note": null,
            "history": [{"billAmount": 10000, "date": "01/02/2025"}],
        });
        let fields = record.as_object().cloned().unwrap();

        let encoded = encode_fields(&fields);
        assert_eq!(encoded["totalEarning"], json!({"integerValue": "1500"}));
        assert_eq!(encoded["ratio"], json!({"doubleValue": 0.25}));
        assert_eq!(
            encoded["history"]["arrayValue"]["values"][0]["mapValue"]["fields"]["date"],
            json!({"stringValue": "01/02/2025"})
        );

        let decoded = decode_fields(encoded.as_object().unwrap()).unwrap();
        assert_eq!(Value::Object(decoded), record);
    }

    #[test]
    fn empty_containers_decode() {
        assert_eq!(decode_value(&json!({"arrayValue": {}})).unwrap(), json!([]));
        assert_eq!(decode_value(&json!({"mapValue": {}})).unwrap(), json!({}));
    }

    #[test]
    fn timestamps_decode_as_strings() {
        let v = decode_value(&json!({"timestampValue": "2025-01-02T03:04:05Z"})).unwrap();
        assert_eq!(v, json!("2025-01-02T03:04:05Z"));
    }

    #[test]
    fn document_id_comes_from_name() {
        let doc = decode_document(&json!({
            "name": "projects/p/databases/(default)/documents/users/u-1",
            "fields": {"mobile": {"stringValue": "9"}}
        }))
        .unwrap();
        assert_eq!(doc.id, "u-1");
        assert_eq!(doc.fields["mobile"], json!("9"));
    }

    #[test]
    fn unknown_type_is_a_decode_error() {
        assert!(matches!(
            decode_value(&json!({"vectorValue": {}})),
            Err(StoreError::Decode { .. })
        ));
    }
}
