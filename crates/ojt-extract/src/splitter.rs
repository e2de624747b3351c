//! Content Splitter
//!
//! Divides extracted text into paragraph-aligned segments, one per learning
//! step, and decides how many steps a text needs from the reading budget.

use ojt_core::ReadingConfig;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static BLANK_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t\r]*\n").expect("valid regex"));

/// Split `text` into `steps` segments.
///
/// `steps <= 1` returns the text unchanged. Otherwise the result has exactly
/// `steps` entries: paragraphs are grouped into contiguous chunks of
/// `ceil(paragraphs / steps)`, and steps without paragraphs are empty strings.
pub fn split(text: &str, steps: usize) -> Vec<String> {
    if steps <= 1 {
        return vec![text.to_string()];
    }

    let paragraphs = paragraphs(text);

    if paragraphs.len() < steps {
        let mut segments: Vec<String> = paragraphs.into_iter().map(str::to_string).collect();
        segments.resize(steps, String::new());
        return segments;
    }

    let per_chunk = paragraphs.len().div_ceil(steps);
    let mut segments = Vec::with_capacity(steps);

    for index in 0..steps {
        let start = (index * per_chunk).min(paragraphs.len());
        let end = if index == steps - 1 {
            paragraphs.len()
        } else {
            ((index + 1) * per_chunk).min(paragraphs.len())
        };
        segments.push(paragraphs[start..end].join("\n\n"));
    }

    debug!(
        paragraphs = paragraphs.len(),
        steps,
        per_chunk,
        "Split text into steps"
    );

    segments
}

/// Number of steps needed to read `char_count` characters within the
/// per-step reading budget, clamped to `1..=max_steps`.
pub fn plan_steps(char_count: usize, reading: &ReadingConfig) -> usize {
    char_count
        .div_ceil(reading.chars_per_step())
        .clamp(1, reading.max_steps.max(1))
}

fn paragraphs(text: &str) -> Vec<&str> {
    BLANK_LINE
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_two_paragraphs_two_steps() {
        assert_eq!(split("Intro.\n\nDetails.", 2), vec!["Intro.", "Details."]);
    }

    #[test]
    fn test_single_step_is_identity() {
        let text = "  keep\n\n  as is ";
        assert_eq!(split(text, 1), vec![text]);
        assert_eq!(split(text, 0), vec![text]);
    }

    #[test]
    fn test_pads_when_too_few_paragraphs() {
        assert_eq!(split("Only one.", 3), vec!["Only one.", "", ""]);
    }

    #[test]
    fn test_even_distribution() {
        let text = "p1\n\np2\n\np3\n\np4\n\np5\n\np6";
        assert_eq!(split(text, 3), vec!["p1\n\np2", "p3\n\np4", "p5\n\np6"]);
    }

    #[test]
    fn test_uneven_distribution_keeps_step_count() {
        let text = "p1\n\np2\n\np3\n\np4\n\np5";
        let segments = split(text, 4);
        assert_eq!(segments, vec!["p1\n\np2", "p3\n\np4", "p5", ""]);
    }

    #[test]
    fn test_conserves_paragraphs_in_order() {
        let paragraphs: Vec<String> = (1..=17).map(|i| format!("paragraph {}", i)).collect();
        let text = paragraphs.join("\n \n");

        for steps in 2..=6 {
            let segments = split(&text, steps);
            assert_eq!(segments.len(), steps);

            let rejoined: Vec<String> = segments
                .iter()
                .filter(|s| !s.is_empty())
                .flat_map(|s| s.split("\n\n").map(str::to_string))
                .collect();
            assert_eq!(rejoined, paragraphs);
        }
    }

    #[test]
    fn test_blank_paragraphs_dropped() {
        assert_eq!(split("a\n\n   \n\n\nb", 2), vec!["a", "b"]);
    }

    #[test]
    fn test_plan_steps() {
        let reading = ReadingConfig {
            chars_per_minute: 100,
            minutes_per_step: 2,
            max_steps: 5,
        };

        assert_eq!(plan_steps(0, &reading), 1);
        assert_eq!(plan_steps(200, &reading), 1);
        assert_eq!(plan_steps(201, &reading), 2);
        assert_eq!(plan_steps(100_000, &reading), 5);
    }
}
