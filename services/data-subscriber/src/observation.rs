use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Errors raised while extracting observations from a message payload
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Payload is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Missing field {path}")]
    MissingField { path: String },

    #[error("Invalid field {path}: expected {expected}")]
    InvalidField { path: String, expected: &'static str },
}

impl ParseError {
    /// Path of the offending field, if the payload was valid JSON
    pub fn path(&self) -> Option<&str> {
        match self {
            ParseError::InvalidJson(_) => None,
            ParseError::MissingField { path } | ParseError::InvalidField { path, .. } => {
                Some(path.as_str())
            }
        }
    }
}

/// A single observation value
#[derive(Debug, Clone, PartialEq)]
pub enum ObservationValue {
    Null,
    Text(String),
    Number(Number),
    Bool(bool),
}

impl From<&str> for ObservationValue {
    fn from(value: &str) -> Self {
        ObservationValue::Text(value.to_string())
    }
}

impl From<i64> for ObservationValue {
    fn from(value: i64) -> Self {
        ObservationValue::Number(value.into())
    }
}

impl From<bool> for ObservationValue {
    fn from(value: bool) -> Self {
        ObservationValue::Bool(value)
    }
}

/// Values recorded for one timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct TimestampedValues {
    pub timestamp: String,
    pub values: Vec<ObservationValue>,
}

/// Observation set carried in a SYNOP message
///
/// `observations` keeps the key order of the JSON object. Each value sequence
/// is expected to line up with `headers`, but nothing checks that.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationPayload {
    pub headers: Vec<String>,
    pub logger_id: String,
    pub observations: Vec<TimestampedValues>,
}

/// Extract the observation set from a raw JSON payload
///
/// Expects `properties.observationNames`, `properties.loggerID` and
/// `properties.observations`; anything else in the document is ignored.
pub fn parse(payload: &[u8]) -> Result<ObservationPayload, ParseError> {
    let document: Value = serde_json::from_slice(payload)?;
    let root = as_object(&document, "$")?;
    let properties = as_object(field(root, "properties", "properties")?, "properties")?;

    let headers = as_array(
        field(properties, "observationNames", "properties.observationNames")?,
        "properties.observationNames",
    )?
    .iter()
    .enumerate()
    .map(|(i, name)| {
        name.as_str()
            .map(str::to_string)
            .ok_or_else(|| ParseError::InvalidField {
                path: format!("properties.observationNames[{i}]"),
                expected: "string",
            })
    })
    .collect::<Result<Vec<_>, _>>()?;

    let logger_id = field(properties, "loggerID", "properties.loggerID")?
        .as_str()
        .ok_or_else(|| ParseError::InvalidField {
            path: "properties.loggerID".to_string(),
            expected: "string",
        })?
        .to_string();

    let observations = as_object(
        field(properties, "observations", "properties.observations")?,
        "properties.observations",
    )?
    .iter()
    .map(|(timestamp, values)| -> Result<TimestampedValues, ParseError> {
        let path = format!("properties.observations.{timestamp}");
        let values = as_array(values, &path)?
            .iter()
            .enumerate()
            .map(|(i, value)| to_observation_value(value, || format!("{path}[{i}]")))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TimestampedValues {
            timestamp: timestamp.clone(),
            values,
        })
    })
    .collect::<Result<Vec<_>, _>>()?;

    Ok(ObservationPayload {
        headers,
        logger_id,
        observations,
    })
}

fn field<'a>(object: &'a Map<String, Value>, key: &str, path: &str) -> Result<&'a Value, ParseError> {
    object.get(key).ok_or_else(|| ParseError::MissingField {
        path: path.to_string(),
    })
}

fn as_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>, ParseError> {
    value.as_object().ok_or_else(|| ParseError::InvalidField {
        path: path.to_string(),
        expected: "object",
    })
}

fn as_array<'a>(value: &'a Value, path: &str) -> Result<&'a Vec<Value>, ParseError> {
    value.as_array().ok_or_else(|| ParseError::InvalidField {
        path: path.to_string(),
        expected: "array",
    })
}

fn to_observation_value<F>(value: &Value, path: F) -> Result<ObservationValue, ParseError>
where
    F: FnOnce() -> String,
{
    match value {
        Value::Null => Ok(ObservationValue::Null),
        Value::String(s) => Ok(ObservationValue::Text(s.clone())),
        Value::Number(n) => Ok(ObservationValue::Number(n.clone())),
        Value::Bool(b) => Ok(ObservationValue::Bool(*b)),
        Value::Array(_) | Value::Object(_) => Err(ParseError::InvalidField {
            path: path(),
            expected: "null, string, number or boolean",
        }),
    }
}
