//! Rewrites elliptical follow-up questions into standalone queries.
//!
//! A follow-up like "and when did that happen?" embeds poorly on its own.
//! When an answer model is available we ask it to rewrite the question
//! against the recent conversation; when it is not, or when it fails, we
//! degrade gracefully. Reformulation can never fail the asker's request.

use notelens_provider::ChatModel;
use std::fmt::Write as _;
use tracing::{debug, warn};

use super::conversation::ConversationLog;

/// Produce a retrieval-ready standalone form of `question`.
///
/// Fallback tiers: with no model the question passes through unchanged;
/// with a model the rewritten (trimmed) output is used unless it comes back
/// empty; on model failure the most recent asker turn is prepended for
/// context, or the question passes through if there is none. This function
/// never returns an error.
pub async fn reformulate(
    question: &str,
    recent_turns: &ConversationLog,
    model: Option<&dyn ChatModel>,
) -> String {
    let Some(model) = model else {
        return question.to_string();
    };

    let prompt = build_reformulation_prompt(question, recent_turns);
    match model.generate(&prompt).await {
        Ok(rewritten) => {
            let rewritten = rewritten.trim();
            if rewritten.is_empty() {
                question.to_string()
            } else {
                debug!("reformulated {question:?} -> {rewritten:?}");
                rewritten.to_string()
            }
        }
        Err(e) => {
            warn!("reformulation failed, falling back to heuristic: {e}");
            heuristic_standalone(question, recent_turns)
        }
    }
}

/// Heuristic tier: glue the most recent asker turn onto the question so the
/// embedding at least sees the topic being followed up on.
fn heuristic_standalone(question: &str, recent_turns: &ConversationLog) -> String {
    match recent_turns.last_asker_turn() {
        Some(turn) => format!("{} {}", turn.content, question),
        None => question.to_string(),
    }
}

fn build_reformulation_prompt(question: &str, recent_turns: &ConversationLog) -> String {
    let mut prompt = String::from(
        "Given the conversation below, decide whether the new question is \
         self-contained or a follow-up. If it is self-contained, repeat it \
         unchanged. If it is a follow-up, rewrite it as a single standalone \
         question that keeps its meaning. Reply with the question only.\n\n\
         Conversation:\n",
    );
    for turn in recent_turns.recent() {
        let _ = writeln!(prompt, "{}: {}", turn.role.label(), turn.content);
    }
    let _ = write!(prompt, "\nNew question: {question}");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::conversation::TurnRole;
    use async_trait::async_trait;
    use notelens_provider::{ProviderError, Result as ProviderResult};

    struct EchoModel(&'static str);

    #[async_trait]
    impl ChatModel for EchoModel {
        async fn generate(&self, _prompt: &str) -> ProviderResult<String> {
            Ok(self.0.to_string())
        }

        fn model_name(&self) -> &str {
            "echo"
        }
    }

    struct DownModel;

    #[async_trait]
    impl ChatModel for DownModel {
        async fn generate(&self, _prompt: &str) -> ProviderResult<String> {
            Err(ProviderError::api(503, "model offline"))
        }

        fn model_name(&self) -> &str {
            "down"
        }
    }

    fn log_with_history() -> ConversationLog {
        let mut log = ConversationLog::new();
        log.push(TurnRole::Asker, "what did I write about lichen?");
        log.push(TurnRole::Assistant, "your notes mention crustose lichen");
        log
    }

    #[tokio::test]
    async fn no_model_passes_the_question_through() {
        let log = log_with_history();
        assert_eq!(reformulate("and where?", &log, None).await, "and where?");
    }

    #[tokio::test]
    async fn model_output_is_used_trimmed() {
        let log = log_with_history();
        let model = EchoModel("  where did I write about lichen?  ");
        assert_eq!(
            reformulate("and where?", &log, Some(&model)).await,
            "where did I write about lichen?"
        );
    }

    #[tokio::test]
    async fn empty_model_output_falls_back_to_the_question() {
        let log = log_with_history();
        let model = EchoModel("   ");
        assert_eq!(reformulate("and where?", &log, Some(&model)).await, "and where?");
    }

    #[tokio::test]
    async fn model_failure_uses_last_asker_turn_heuristic() {
        let log = log_with_history();
        assert_eq!(
            reformulate("and where?", &log, Some(&DownModel)).await,
            "what did I write about lichen? and where?"
        );
    }

    #[tokio::test]
    async fn model_failure_without_history_passes_through() {
        let log = ConversationLog::new();
        assert_eq!(
            reformulate("first question", &log, Some(&DownModel)).await,
            "first question"
        );
    }

    #[test]
    fn prompt_contains_turns_and_question() {
        let prompt = build_reformulation_prompt("and where?", &log_with_history());
        assert!(prompt.contains("User: what did I write about lichen?"));
        assert!(prompt.contains("Assistant: your notes mention crustose lichen"));
        assert!(prompt.ends_with("New question: and where?"));
    }
}
