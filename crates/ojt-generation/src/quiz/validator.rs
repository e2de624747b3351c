use ojt_core::{QuizItem, QuizStats, QuizValidationReport};
use std::collections::HashSet;

use super::normalizer::OPTION_COUNT;

/// Scan a pool for quality problems.
///
/// Pure: the same pool always yields the same report. Placeholders are
/// counted and reported but never listed in `flagged_indices`, since there is
/// nothing to regenerate from them.
pub fn validate_pool(pool: &[QuizItem], min_question_chars: usize) -> QuizValidationReport {
    let mut stats = QuizStats {
        total: pool.len(),
        ..QuizStats::default()
    };
    let mut issues = Vec::new();
    let mut flagged_indices = Vec::new();
    let mut seen_questions = HashSet::new();

    for (index, item) in pool.iter().enumerate() {
        let number = index + 1;
        let mut problems = Vec::new();
        let placeholder = item.is_placeholder_item();

        if placeholder {
            stats.placeholders += 1;
            issues.push(format!("Question {}: placeholder item", number));
        }

        let question = item.question.trim();
        if question.chars().count() < min_question_chars {
            stats.short_questions += 1;
            problems.push(format!(
                "Question {}: shorter than {} characters",
                number, min_question_chars
            ));
        }

        if !seen_questions.insert(question.to_lowercase()) {
            stats.duplicates += 1;
            problems.push(format!("Question {}: duplicate question", number));
        }

        if item.correct_index >= item.options.len() {
            problems.push(format!(
                "Question {}: correct index {} is out of range",
                number, item.correct_index
            ));
        }

        if item.options.len() != OPTION_COUNT {
            problems.push(format!(
                "Question {}: has {} options instead of {}",
                number,
                item.options.len(),
                OPTION_COUNT
            ));
        }

        let distinct: HashSet<String> = item
            .options
            .iter()
            .map(|o| o.trim().to_lowercase())
            .collect();
        if distinct.len() != item.options.len() {
            problems.push(format!("Question {}: duplicate options", number));
        }

        if problems.is_empty() {
            if !placeholder {
                stats.valid_count += 1;
            }
        } else if !placeholder {
            flagged_indices.push(index);
        }
        issues.extend(problems);
    }

    QuizValidationReport {
        valid: issues.is_empty(),
        issues,
        stats,
        flagged_indices,
    }
}
