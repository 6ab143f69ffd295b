use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

lazy_static! {
    static ref JSON_OBJECT: Regex = Regex::new(r"(?s)\{.*\}").unwrap();
    static ref JSON_ARRAY: Regex = Regex::new(r"(?s)\[.*\]").unwrap();
}

/// Failure states of best-effort JSON extraction from model output.
/// The caller gets a diagnosable error instead of silently-empty data.
#[derive(Debug, Error)]
pub enum JsonExtractError {
    #[error("no JSON {0} found in model output")]
    NotFound(&'static str),
    #[error("extracted JSON {kind} does not parse: {source}")]
    Parse {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Extract the JSON object embedded in free-text model output. The model
/// may wrap the payload in prose or markdown fencing; the span runs from
/// the first `{` to the last `}`.
pub fn extract_json_object(text: &str) -> Result<serde_json::Value, JsonExtractError> {
    extract(text, &JSON_OBJECT, "object")
}

/// Extract the JSON array embedded in free-text model output.
pub fn extract_json_array(text: &str) -> Result<serde_json::Value, JsonExtractError> {
    extract(text, &JSON_ARRAY, "array")
}

fn extract(
    text: &str,
    pattern: &Regex,
    kind: &'static str,
) -> Result<serde_json::Value, JsonExtractError> {
    let span = pattern
        .find(text)
        .map(|m| m.as_str())
        .ok_or(JsonExtractError::NotFound(kind))?;

    match serde_json::from_str(span) {
        Ok(value) => Ok(value),
        // Models occasionally emit raw control characters inside string
        // literals; retry on a sanitized copy before giving up.
        Err(first_err) => {
            let sanitized: String = span.chars().filter(|c| !c.is_control()).collect();
            serde_json::from_str(&sanitized).map_err(|_| JsonExtractError::Parse {
                kind,
                source: first_err,
            })
        }
    }
}
