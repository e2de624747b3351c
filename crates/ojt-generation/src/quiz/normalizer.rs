use ojt_core::{QuizItem, QuizPool};
use serde_json::Value;
use std::collections::HashSet;

/// Options every normalized item carries
pub const OPTION_COUNT: usize = 4;

const FILLER_OPTIONS: &[&str] = &[
    "None of the above",
    "All of the above",
    "Not covered in this material",
    "Cannot be determined",
    "Other",
];

const STUB_OPTIONS: [&str; OPTION_COUNT] = ["True", "False", "Not covered in this material", "Cannot be determined"];

/// Normalize every entry of a raw quiz array. Numbering in templated
/// questions is 1-based.
pub fn normalize_pool(raw: &[Value], title: &str) -> QuizPool {
    raw.iter()
        .enumerate()
        .map(|(index, value)| normalize_item(value, title, index + 1))
        .collect()
}

/// Shape one raw item into a four-option [`QuizItem`].
///
/// The correct answer is resolved against the options as given, so it stays
/// attached to the right text through de-duplication, truncation and padding.
pub fn normalize_item(raw: &Value, title: &str, number: usize) -> QuizItem {
    let question = raw
        .get("question")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{} — question {}", title, number));

    let given: Vec<String> = raw
        .get("options")
        .and_then(Value::as_array)
        .map(|options| options.iter().filter_map(option_text).collect())
        .unwrap_or_default();

    let correct_text = resolve_correct(raw, &given);
    let mut options = dedupe(given);

    if options.len() < 2 {
        return QuizItem::new(
            question,
            STUB_OPTIONS.iter().map(|s| s.to_string()).collect(),
            0,
        );
    }

    if options.len() > OPTION_COUNT {
        let keep_correct = correct_text
            .as_ref()
            .and_then(|text| position_of(&options, text))
            .filter(|&pos| pos >= OPTION_COUNT);
        if let Some(pos) = keep_correct {
            options.swap(OPTION_COUNT - 1, pos);
        }
        options.truncate(OPTION_COUNT);
    }

    for filler in FILLER_OPTIONS {
        if options.len() >= OPTION_COUNT {
            break;
        }
        if position_of(&options, filler).is_none() {
            options.push(filler.to_string());
        }
    }

    let correct_index = correct_text
        .and_then(|text| position_of(&options, &text))
        .unwrap_or(0);

    QuizItem::new(question, options, correct_index)
}

fn option_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Object(map) => map
            .get("text")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())?,
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Text of the correct option as given by the model, if it can be told
fn resolve_correct(raw: &Value, options: &[String]) -> Option<String> {
    ["correctIndex", "correct_index", "answerIndex", "answer"]
        .iter()
        .filter_map(|key| raw.get(*key))
        .find_map(|value| match value {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64))
                .and_then(|i| options.get(i as usize).cloned()),
            Value::String(s) => {
                let s = s.trim();
                position_of(options, s)
                    .map(|pos| options[pos].clone())
                    .or_else(|| s.parse::<usize>().ok().and_then(|i| options.get(i).cloned()))
            }
            _ => None,
        })
}

fn dedupe(options: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    options
        .into_iter()
        .filter(|option| seen.insert(option.to_lowercase()))
        .collect()
}

fn position_of(options: &[String], text: &str) -> Option<usize> {
    let needle = text.trim().to_lowercase();
    options.iter().position(|o| o.to_lowercase() == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn assert_shape(item: &QuizItem) {
        assert_eq!(item.options.len(), OPTION_COUNT);
        assert!(item.correct_index < OPTION_COUNT);
        let distinct: HashSet<String> = item.options.iter().map(|o| o.to_lowercase()).collect();
        assert_eq!(distinct.len(), OPTION_COUNT);
        assert_eq!(item.answer, item.options[item.correct_index]);
    }

    #[test]
    fn test_well_formed_item_unchanged() {
        let item = normalize_item(
            &json!({"question": "Max load?", "options": ["1t", "2t", "3t", "4t"], "correctIndex": 2}),
            "Forklift",
            1,
        );
        assert_eq!(item.options, vec!["1t", "2t", "3t", "4t"]);
        assert_eq!(item.correct_index, 2);
        assert_eq!(item.answer, "3t");
        assert!(!item.is_placeholder);
    }

    #[test]
    fn test_stub_for_too_few_options() {
        let item = normalize_item(&json!({"question": "Q?", "options": ["only"]}), "T", 1);
        assert_shape(&item);
        assert_eq!(item.options[0], "True");
        assert_eq!(item.correct_index, 0);
    }

    #[test]
    fn test_pads_two_options() {
        let item = normalize_item(
            &json!({"question": "Q?", "options": ["Yes", "No"], "correctIndex": 1}),
            "T",
            1,
        );
        assert_shape(&item);
        assert_eq!(item.options[..2].to_vec(), vec!["Yes", "No"]);
        assert_eq!(item.answer, "No");
    }

    #[test]
    fn test_truncates_and_keeps_correct_answer() {
        let item = normalize_item(
            &json!({"question": "Q?", "options": ["a", "b", "c", "d", "e", "f"], "correctIndex": 5}),
            "T",
            1,
        );
        assert_shape(&item);
        assert_eq!(item.options, vec!["a", "b", "c", "f"]);
        assert_eq!(item.answer, "f");
    }

    #[test]
    fn test_duplicate_options_removed_case_insensitively() {
        let item = normalize_item(
            &json!({"question": "Q?", "options": ["Helmet", "helmet", "Gloves", "Boots"], "answer": "Boots"}),
            "T",
            1,
        );
        assert_shape(&item);
        assert_eq!(item.options[..3].to_vec(), vec!["Helmet", "Gloves", "Boots"]);
        assert_eq!(item.answer, "Boots");
    }

    #[test]
    fn test_correct_index_forms() {
        let options = json!(["a", "b", "c", "d"]);
        let by_string = normalize_item(&json!({"question": "Q", "options": options, "correctIndex": "3"}), "T", 1);
        let by_text = normalize_item(&json!({"question": "Q", "options": options, "answer": "C"}), "T", 1);
        let snake = normalize_item(&json!({"question": "Q", "options": options, "correct_index": 1}), "T", 1);
        let invalid = normalize_item(&json!({"question": "Q", "options": options, "correctIndex": 9}), "T", 1);
        let negative = normalize_item(&json!({"question": "Q", "options": options, "correctIndex": -1}), "T", 1);

        assert_eq!(by_string.correct_index, 3);
        assert_eq!(by_text.correct_index, 2);
        assert_eq!(snake.correct_index, 1);
        assert_eq!(invalid.correct_index, 0);
        assert_eq!(negative.correct_index, 0);
    }

    #[test]
    fn test_blank_question_templated() {
        let pool = normalize_pool(
            &[
                json!({"question": "First?", "options": ["a", "b", "c", "d"]}),
                json!({"question": "   ", "options": ["a", "b", "c", "d"]}),
            ],
            "Lockout",
        );
        assert_eq!(pool[1].question, "Lockout — question 2");
    }

    #[test]
    fn test_garbage_item_still_shaped() {
        let item = normalize_item(&json!("not an object"), "T", 4);
        assert_shape(&item);
        assert_eq!(item.question, "T — question 4");
    }
}
