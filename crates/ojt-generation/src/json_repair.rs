//! Best-effort parsing of model output
//!
//! Models are told to answer with bare JSON but still wrap it in code fences,
//! add prose around it, leave trailing commas or emit raw control characters
//! inside strings. Each repair is applied only when plain parsing fails.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::{GenerationError, Result};

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*```[A-Za-z0-9_-]*\s*$").expect("valid regex"));
static CONTROL_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x00-\x1F\x7F]+").expect("valid regex"));
static TRAILING_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*([}\]])").expect("valid regex"));

/// Parse `raw` as a JSON object, repairing common model mistakes.
pub fn parse_model_json(raw: &str) -> Result<Value> {
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(raw.trim()) {
        return Ok(value);
    }

    let repaired = repair(raw)
        .ok_or_else(|| GenerationError::Parse("no JSON object found in model output".to_string()))?;

    match serde_json::from_str::<Value>(&repaired) {
        Ok(value @ Value::Object(_)) => {
            debug!("Model output parsed after repair");
            Ok(value)
        }
        Ok(_) => Err(GenerationError::Parse("model output is not a JSON object".to_string())),
        Err(e) => Err(GenerationError::Parse(e.to_string())),
    }
}

/// Apply every repair step; `None` when there is no `{...}` span at all.
pub fn repair(raw: &str) -> Option<String> {
    let unfenced = CODE_FENCE.replace_all(raw, "");
    let object = largest_object(&unfenced)?;
    let flattened = CONTROL_CHARS.replace_all(object, " ");
    Some(TRAILING_COMMA.replace_all(&flattened, "$1").into_owned())
}

/// From the first `{` to the last `}`
fn largest_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
