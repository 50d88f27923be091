//! Prompt types for NoteWise.

use serde::{Deserialize, Serialize};

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Label used when the turn is rendered into a prompt.
    pub fn label(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
        }
    }
}

/// One (role, text) entry of a session's conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }

    /// Length in characters, the unit of the history budget.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// A prompt override loaded from YAML.
///
/// ```yaml
/// id: notes.strict
/// system: "Answer only from the notes."
/// template: |
///   {{#each context}}{{this}}
///   {{/each}}
///   Question: {{question}}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Prompt identifier, used in logs
    #[serde(default = "default_prompt_id")]
    pub id: String,

    /// System directive; the built-in grounding directive when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Template string with Handlebars syntax.
    ///
    /// Available variables: `history` (list of `{role, text}`), `context`
    /// (list of chunk texts) and `question`.
    pub template: String,
}

fn default_prompt_id() -> String {
    "custom".to_string()
}

/// A fully built prompt ready for LLM execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// System message
    pub system: String,

    /// User message (history, context and question)
    pub user: String,

    /// Number of prior turns included
    pub history_turns: usize,

    /// Number of prior turns dropped to fit the budget
    pub dropped_turns: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_definition_deserialization() {
        let yaml = r#"
id: notes.strict
system: "Only use the notes."
template: "Question: {{question}}"
"#;

        let def: PromptDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.id, "notes.strict");
        assert_eq!(def.system.as_deref(), Some("Only use the notes."));
    }

    #[test]
    fn test_prompt_definition_defaults() {
        let def: PromptDefinition = serde_yaml::from_str("template: \"{{question}}\"").unwrap();
        assert_eq!(def.id, "custom");
        assert!(def.system.is_none());
    }

    #[test]
    fn test_turn_constructors() {
        let turn = Turn::user("héllo");
        assert_eq!(turn.role, Role::User);
        assert_eq!(turn.char_len(), 5);
        assert_eq!(Turn::assistant("x").role.as_str(), "assistant");
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Turn::assistant("ok")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","text":"ok"}"#);
    }
}
