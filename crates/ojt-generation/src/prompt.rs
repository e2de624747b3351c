//! Prompt construction

use crate::engine::GenerationRequest;

/// Prompt asking the model for a JSON-only OJT document
pub fn build_prompt(request: &GenerationRequest) -> String {
    let mut prompt = String::new();

    prompt.push_str(
        "You are an instructional designer writing on-the-job training material.\n\
         Respond with a single JSON object and nothing else. No markdown, no code fences.\n\n",
    );

    if request.regeneration {
        prompt.push_str(&format!(
            "Write {} new multiple-choice quiz questions about the material below.\n\
             Schema: {{\"quiz\": [{{\"question\": string, \"options\": [4 strings], \"correctIndex\": 0-3}}]}}\n",
            request.quiz_size
        ));
    } else {
        prompt.push_str(
            "Schema: {\"title\": string, \
             \"sections\": [{\"title\": string, \"content\": HTML string using only p, ul, ol, li, strong, em, h3, h4}], \
             \"quiz\": [{\"question\": string, \"options\": [4 strings], \"correctIndex\": 0-3}]}\n",
        );
        prompt.push_str(&format!(
            "Write 3 to 6 sections and exactly {} quiz questions.\n",
            request.quiz_size
        ));
    }

    prompt.push_str(
        "Every question needs four distinct options and exactly one correct answer. \
         Write in the language of the material.\n\n",
    );

    prompt.push_str(&format!("Title: {}\n", request.title));
    if !request.team.is_empty() {
        prompt.push_str(&format!("Team: {}\n", request.team));
    }
    if request.total_steps > 1 {
        prompt.push_str(&format!(
            "This is step {} of {}. Cover only this part.\n",
            request.step, request.total_steps
        ));
    }

    prompt.push_str("\nMaterial:\n");
    prompt.push_str(&request.text);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_mentions_step_and_quiz_size() {
        let request = GenerationRequest::new("Check tyre pressure weekly.", "Fleet care")
            .with_team("Drivers")
            .with_step(2, 4)
            .with_quiz_size(12);

        let prompt = build_prompt(&request);

        assert!(prompt.contains("exactly 12 quiz questions"));
        assert!(prompt.contains("step 2 of 4"));
        assert!(prompt.contains("Team: Drivers"));
        assert!(prompt.ends_with("Check tyre pressure weekly."));
    }

    #[test]
    fn test_regeneration_prompt_asks_only_for_quiz() {
        let request = GenerationRequest::new("text", "Title").for_regeneration(3);
        let prompt = build_prompt(&request);

        assert!(prompt.contains("Write 3 new multiple-choice quiz questions"));
        assert!(!prompt.contains("sections"));
    }
}
