//! Keyword-based evaluation of the chatbot against a question dataset.
//!
//! A case passes when at least half of its expected keywords appear in the answer,
//! case-insensitively. A keyword written `a|b` matches if either alternative does.

use crate::error::Result;
use crate::rag::Chatbot;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// One evaluation question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub category: String,
    pub question: String,
    #[serde(default)]
    pub expected_answer_contains: Vec<String>,
    /// Asked after the main question, before memory is reset.
    #[serde(default)]
    pub follow_up: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestDataset {
    pub test_cases: Vec<TestCase>,
}

/// Load a dataset of the form `{"test_cases": [...]}`.
pub fn load_dataset(path: &Path) -> Result<TestDataset> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Expected keywords found in `answer`.
pub fn matched_keywords(answer: &str, expected: &[String]) -> Vec<String> {
    let answer = answer.to_lowercase();
    expected
        .iter()
        .filter(|keyword| {
            keyword
                .split('|')
                .any(|alternative| answer.contains(&alternative.to_lowercase()))
        })
        .cloned()
        .collect()
}

/// Whether `matched` keywords out of `expected` is enough to pass.
pub fn passes(matched: usize, expected: usize) -> bool {
    matched * 2 >= expected
}

#[derive(Debug, Clone, Serialize)]
pub struct CaseResult {
    pub category: String,
    pub question: String,
    pub answer: String,
    pub matched: Vec<String>,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_up_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Excellent,
    Good,
    NeedsWork,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EvaluationReport {
    pub results: Vec<CaseResult>,
}

impl EvaluationReport {
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// Percentage of passed cases.
    pub fn score(&self) -> f64 {
        if self.results.is_empty() {
            return 0.0;
        }
        self.passed() as f64 * 100.0 / self.total() as f64
    }

    pub fn verdict(&self) -> Verdict {
        let score = self.score();
        if score >= 80.0 {
            Verdict::Excellent
        } else if score >= 60.0 {
            Verdict::Good
        } else {
            Verdict::NeedsWork
        }
    }
}

/// Run every case through `chatbot`, resetting its memory after each one. A failed
/// question counts as a failed case. `on_case` sees each result as it completes.
pub async fn evaluate<F>(
    chatbot: &mut Chatbot,
    dataset: &TestDataset,
    mut on_case: F,
) -> Result<EvaluationReport>
where
    F: FnMut(usize, &CaseResult),
{
    let mut report = EvaluationReport::default();

    for (i, case) in dataset.test_cases.iter().enumerate() {
        let mut result = CaseResult {
            category: case.category.clone(),
            question: case.question.clone(),
            answer: String::new(),
            matched: Vec::new(),
            passed: false,
            follow_up_answer: None,
            error: None,
        };

        match chatbot.ask(&case.question).await {
            Ok(response) => {
                result.matched = matched_keywords(&response.answer, &case.expected_answer_contains);
                result.passed = passes(result.matched.len(), case.expected_answer_contains.len());
                result.answer = response.answer;

                if let Some(follow_up) = &case.follow_up {
                    match chatbot.ask(follow_up).await {
                        Ok(response) => result.follow_up_answer = Some(response.answer),
                        Err(e) => warn!("Follow-up failed for case {}: {}", i + 1, e),
                    }
                }
            }
            Err(e) => {
                warn!("Case {} failed: {}", i + 1, e);
                result.error = Some(e.to_string());
            }
        }

        chatbot.reset();
        on_case(i, &result);
        report.results.push(result);
    }

    info!(
        "Evaluation: {}/{} passed ({:.1}%)",
        report.passed(),
        report.total(),
        report.score()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::embedding::testing::KeywordEmbedder;
    use crate::embedding::{EmbeddingGenerator, RetryPolicy};
    use crate::error::PulsError;
    use crate::rag::llm::testing::ScriptedChat;
    use crate::rag::RagEngine;
    use crate::vector_store::tests::sample_store;
    use std::sync::Arc;

    fn keywords(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn chatbot(chat: Arc<ScriptedChat>) -> Chatbot {
        // Three dimensions, like the sample store.
        let embedder = KeywordEmbedder::new(&["jazz", "photo"]).named("test-embed");
        let embeddings = EmbeddingGenerator::new(Arc::new(embedder))
            .with_policy(RetryPolicy::default().without_delays());
        let engine = RagEngine::new(Arc::new(sample_store()), embeddings, chat).unwrap();

        let mut chatbot = Chatbot::new(Settings::default());
        chatbot.initialize_with(Arc::new(engine));
        chatbot
    }

    #[test]
    fn test_alternatives_and_case() {
        let matched = matched_keywords(
            "Rendez-vous SAMEDI au Zénith",
            &keywords(&["samedi|dimanche", "zénith", "gratuit"]),
        );
        assert_eq!(matched, keywords(&["samedi|dimanche", "zénith"]));
    }

    #[test]
    fn test_half_the_keywords_is_enough() {
        assert!(passes(1, 2));
        assert!(passes(2, 3));
        assert!(!passes(1, 3));
        assert!(passes(0, 0));
    }

    #[test]
    fn test_verdict_bands() {
        let report = |passed: usize, total: usize| EvaluationReport {
            results: (0..total)
                .map(|i| CaseResult {
                    category: String::new(),
                    question: String::new(),
                    answer: String::new(),
                    matched: Vec::new(),
                    passed: i < passed,
                    follow_up_answer: None,
                    error: None,
                })
                .collect(),
        };
        assert_eq!(report(4, 5).verdict(), Verdict::Excellent);
        assert_eq!(report(3, 5).verdict(), Verdict::Good);
        assert_eq!(report(2, 5).verdict(), Verdict::NeedsWork);
        assert_eq!(report(0, 0).score(), 0.0);
    }

    #[test]
    fn test_dataset_parsing() {
        let json = r#"{"test_cases": [
            {"category": "Musique", "question": "Un concert ?", "expected_answer_contains": ["concert"]},
            {"category": "Suivi", "question": "Et demain ?", "follow_up": "Où ?"}
        ]}"#;
        let dataset: TestDataset = serde_json::from_str(json).unwrap();
        assert_eq!(dataset.test_cases.len(), 2);
        assert!(dataset.test_cases[1].expected_answer_contains.is_empty());
        assert_eq!(dataset.test_cases[1].follow_up.as_deref(), Some("Où ?"));
    }

    #[tokio::test]
    async fn test_evaluate_resets_between_cases() {
        let chat = Arc::new(ScriptedChat::with_replies(vec![
            Ok("Un concert de jazz samedi".to_string()),
            Ok("Au Splendid".to_string()),
            Err(PulsError::Llm("timeout".to_string())),
        ]));
        let mut chatbot = chatbot(chat.clone());
        let dataset = TestDataset {
            test_cases: vec![
                TestCase {
                    category: "Musique".to_string(),
                    question: "Du jazz ?".to_string(),
                    expected_answer_contains: keywords(&["jazz", "samedi|dimanche"]),
                    follow_up: Some("Où ?".to_string()),
                },
                TestCase {
                    category: "Expo".to_string(),
                    question: "Une expo photo ?".to_string(),
                    expected_answer_contains: keywords(&["photo"]),
                    follow_up: None,
                },
            ],
        };

        let mut seen = 0;
        let report = evaluate(&mut chatbot, &dataset, |_, _| seen += 1).await.unwrap();

        assert_eq!(seen, 2);
        assert!(report.results[0].passed);
        assert_eq!(report.results[0].follow_up_answer.as_deref(), Some("Au Splendid"));
        assert!(!report.results[1].passed);
        assert!(report.results[1].error.is_some());
        assert_eq!(report.score(), 50.0);

        // The second case started from an empty memory.
        let prompts = chat.prompts.lock().unwrap();
        assert_eq!(prompts[2].len(), 2);
    }
}
