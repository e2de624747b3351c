use ojt_core::{QuizItem, QuizPool, PLACEHOLDER_MARKER};

/// A trivially answerable item marking a gap in the pool
pub fn placeholder_item(title: &str, number: usize) -> QuizItem {
    let mut item = QuizItem::new(
        format!("{} Review question {} for \"{}\"", PLACEHOLDER_MARKER, number, title),
        vec![
            "I have reviewed this step".to_string(),
            "I have not reviewed this step".to_string(),
            "I need help with this step".to_string(),
            "This step does not apply to me".to_string(),
        ],
        0,
    );
    item.is_placeholder = true;
    item
}

/// Append placeholders until the pool holds `target` items. Existing items are
/// kept as they are, in order.
pub fn fill_placeholders(pool: QuizPool, target: usize, title: &str) -> QuizPool {
    let mut pool = pool;
    let start = pool.len();
    pool.extend((start..target).map(|index| placeholder_item(title, index + 1)));
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding_law() {
        let existing = vec![QuizItem::new("Real question?", vec!["a".into(), "b".into(), "c".into(), "d".into()], 1)];
        let pool = fill_placeholders(existing.clone(), 5, "Hygiene");

        assert_eq!(pool.len(), 5);
        assert_eq!(pool[0], existing[0]);
        assert!(pool[1..].iter().all(|item| item.is_placeholder && item.is_placeholder_item()));
        assert!(pool[4].question.contains("Review question 5"));
    }

    #[test]
    fn test_never_truncates() {
        let existing: QuizPool = (0..3).map(|i| placeholder_item("T", i + 1)).collect();
        assert_eq!(fill_placeholders(existing, 2, "T").len(), 3);
    }

    #[test]
    fn test_placeholder_marker() {
        let item = placeholder_item("Forklift", 1);
        assert!(item.question.starts_with(PLACEHOLDER_MARKER));
        assert_eq!(item.correct_index, 0);
        assert_eq!(item.options.len(), 4);
    }
}
