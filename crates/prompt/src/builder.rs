//! Prompt builder for rendering the grounded chat prompt.

use crate::types::{BuiltPrompt, PromptDefinition, Turn};
use handlebars::Handlebars;
use notewise_core::{AppError, AppResult};
use serde::Serialize;

/// Fixed system directive sent with every answer.
pub const SYSTEM_DIRECTIVE: &str = "You are NoteWise, an assistant that answers questions about \
the user's own notes. Ground every answer in the provided context. If the context does not \
contain the answer, say explicitly that your notes do not cover it instead of guessing.";

/// Default user-message template.
pub const DEFAULT_TEMPLATE: &str = "{{#if history}}Conversation so far:
{{#each history}}{{this.role}}: {{this.text}}
{{/each}}
{{/if}}Context from the notes:
{{#each context}}---
{{this}}
{{else}}(no relevant notes were found)
{{/each}}---

Question: {{question}}";

const TEMPLATE_NAME: &str = "chat";

#[derive(Serialize)]
struct HistoryLine<'a> {
    role: &'static str,
    text: &'a str,
}

#[derive(Serialize)]
struct TemplateData<'a> {
    history: Vec<HistoryLine<'a>>,
    context: &'a [String],
    question: &'a str,
}

/// Renders chat prompts from history, retrieved context and the question.
///
/// The template is compiled once; building a prompt is cheap and safe to do
/// from many tasks at once.
pub struct PromptBuilder {
    handlebars: Handlebars<'static>,
    system: String,
    history_budget_chars: usize,
}

impl PromptBuilder {
    /// Builder with the built-in template and system directive.
    pub fn new(history_budget_chars: usize) -> AppResult<Self> {
        Self::with_template(SYSTEM_DIRECTIVE, DEFAULT_TEMPLATE, history_budget_chars)
    }

    /// Builder from a YAML override; the system directive falls back to
    /// [`SYSTEM_DIRECTIVE`].
    pub fn from_definition(
        definition: &PromptDefinition,
        history_budget_chars: usize,
    ) -> AppResult<Self> {
        tracing::debug!(prompt = %definition.id, "Using custom prompt template");
        let system = definition.system.as_deref().unwrap_or(SYSTEM_DIRECTIVE);
        Self::with_template(system, &definition.template, history_budget_chars)
    }

    fn with_template(system: &str, template: &str, history_budget_chars: usize) -> AppResult<Self> {
        let mut handlebars = Handlebars::new();

        // Disable HTML escaping for plain text
        handlebars.register_escape_fn(handlebars::no_escape);

        handlebars
            .register_template_string(TEMPLATE_NAME, template)
            .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

        Ok(Self {
            handlebars,
            system: system.to_string(),
            history_budget_chars,
        })
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    /// Build the prompt for one question.
    ///
    /// `history` is the session's prior turns, oldest first; it is trimmed to
    /// the history budget before rendering.
    pub fn build(
        &self,
        history: &[Turn],
        context: &[String],
        question: &str,
    ) -> AppResult<BuiltPrompt> {
        let kept = budget_history(history, self.history_budget_chars);
        let dropped = history.len() - kept.len();
        if dropped > 0 {
            tracing::debug!(dropped, kept = kept.len(), "Trimmed conversation history");
        }

        let data = TemplateData {
            history: kept
                .iter()
                .map(|turn| HistoryLine {
                    role: turn.role.label(),
                    text: &turn.text,
                })
                .collect(),
            context,
            question,
        };

        let user = self
            .handlebars
            .render(TEMPLATE_NAME, &data)
            .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

        Ok(BuiltPrompt {
            system: self.system.clone(),
            user,
            history_turns: kept.len(),
            dropped_turns: dropped,
        })
    }
}

/// Trim `history` so its total text length fits `budget_chars`.
///
/// Turns are dropped oldest first in user/assistant pairs, so the kept
/// history never starts with a dangling answer.
pub fn budget_history(history: &[Turn], budget_chars: usize) -> &[Turn] {
    let mut total: usize = history.iter().map(Turn::char_len).sum();
    let mut start = 0;

    while total > budget_chars && start < history.len() {
        let end = (start + 2).min(history.len());
        total -= history[start..end].iter().map(Turn::char_len).sum::<usize>();
        start = end;
    }

    &history[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exchange(q: &str, a: &str) -> Vec<Turn> {
        vec![Turn::user(q), Turn::assistant(a)]
    }

    #[test]
    fn test_build_includes_context_and_question() {
        let builder = PromptBuilder::new(1000).unwrap();
        let context = vec!["The quarterly report was delayed.".to_string()];

        let built = builder.build(&[], &context, "Why the delay?").unwrap();

        assert_eq!(built.system, SYSTEM_DIRECTIVE);
        assert!(built.user.contains("The quarterly report was delayed."));
        assert!(built.user.ends_with("Question: Why the delay?"));
        assert!(!built.user.contains("Conversation so far"));
        assert_eq!(built.history_turns, 0);
    }

    #[test]
    fn test_build_renders_history_in_order() {
        let builder = PromptBuilder::new(1000).unwrap();
        let history = exchange("first question", "first answer");

        let built = builder.build(&history, &[], "second question").unwrap();

        let q = built.user.find("User: first question").unwrap();
        let a = built.user.find("Assistant: first answer").unwrap();
        assert!(q < a);
        assert_eq!(built.history_turns, 2);
    }

    #[test]
    fn test_build_without_context_says_so() {
        let builder = PromptBuilder::new(1000).unwrap();
        let built = builder.build(&[], &[], "anything?").unwrap();
        assert!(built.user.contains("no relevant notes were found"));
    }

    #[test]
    fn test_special_characters_are_not_escaped() {
        let builder = PromptBuilder::new(1000).unwrap();
        let context = vec!["a < b && c > d".to_string()];
        let built = builder.build(&[], &context, "what's \"x\"?").unwrap();
        assert!(built.user.contains("a < b && c > d"));
        assert!(built.user.contains("what's \"x\"?"));
    }

    #[test]
    fn test_budget_keeps_everything_under_limit() {
        let history = exchange("abc", "def");
        assert_eq!(budget_history(&history, 6).len(), 2);
    }

    #[test]
    fn test_budget_drops_oldest_pairs() {
        let mut history = exchange("old question", "old answer");
        history.extend(exchange("new q", "new a"));

        let kept = budget_history(&history, 10);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0], Turn::user("new q"));
    }

    #[test]
    fn test_budget_zero_drops_all() {
        let history = exchange("q", "a");
        assert!(budget_history(&history, 0).is_empty());
    }

    #[test]
    fn test_build_reports_dropped_turns() {
        let builder = PromptBuilder::new(5).unwrap();
        let mut history = exchange("a long old question", "a long old answer");
        history.extend(exchange("q", "a"));

        let built = builder.build(&history, &[], "next").unwrap();
        assert_eq!(built.dropped_turns, 2);
        assert!(!built.user.contains("old question"));
    }

    #[test]
    fn test_custom_definition() {
        let def = PromptDefinition {
            id: "terse".to_string(),
            system: None,
            template: "Q={{question}} C={{#each context}}[{{this}}]{{/each}}".to_string(),
        };
        let builder = PromptBuilder::from_definition(&def, 100).unwrap();
        let built = builder
            .build(&[], &["one".to_string(), "two".to_string()], "why")
            .unwrap();

        assert_eq!(built.user, "Q=why C=[one][two]");
        assert_eq!(builder.system(), SYSTEM_DIRECTIVE);
    }

    #[test]
    fn test_invalid_template_is_rejected() {
        let def = PromptDefinition {
            id: "broken".to_string(),
            system: None,
            template: "{{#each context}}never closed".to_string(),
        };
        assert!(matches!(
            PromptBuilder::from_definition(&def, 100),
            Err(AppError::Prompt(_))
        ));
    }
}
