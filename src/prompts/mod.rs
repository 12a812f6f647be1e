//! Built-in prompt templates.

use crate::error::{HandlerResult, RegistryResult, ToolError};
use crate::protocol::{GetPromptResult, Prompt, PromptArgument, PromptMessage};
use crate::registry::{PromptArguments, PromptHandler, RegistryBuilder};
use async_trait::async_trait;

fn argument(name: &str, description: &str, required: bool) -> PromptArgument {
    PromptArgument {
        name: name.into(),
        description: Some(description.into()),
        required: Some(required),
    }
}

fn required<'a>(arguments: &'a PromptArguments, name: &'static str) -> HandlerResult<&'a str> {
    arguments
        .get(name)
        .map(String::as_str)
        .ok_or(ToolError::MissingArgument(name.into()))
}

/// Code review request for a snippet.
pub struct CodeReviewPrompt;

impl CodeReviewPrompt {
    pub fn descriptor() -> Prompt {
        Prompt {
            name: "codeReview".into(),
            description: Some("Ask for a review of a code snippet".into()),
            arguments: Some(vec![
                argument("code", "Code to review", true),
                argument("language", "Programming language", false),
            ]),
        }
    }
}

#[async_trait]
impl PromptHandler for CodeReviewPrompt {
    async fn render(&self, arguments: &PromptArguments) -> HandlerResult<GetPromptResult> {
        let code = required(arguments, "code")?;
        let language = arguments
            .get("language")
            .map(String::as_str)
            .unwrap_or("unknown");

        let text = format!(
            "Please review the following {language} code and suggest improvements:\n\n\
             ```{language}\n{code}\n```\n\n\
             Cover:\n\
             1. Code quality and readability\n\
             2. Potential bugs or vulnerabilities\n\
             3. Performance\n\
             4. Adherence to best practices"
        );

        Ok(GetPromptResult {
            description: Some(format!("Code review for {language} code")),
            messages: vec![PromptMessage::user(text)],
        })
    }
}

/// Audience for [`ExplainConceptPrompt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Level {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl Level {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "beginner" => Some(Self::Beginner),
            "intermediate" => Some(Self::Intermediate),
            "advanced" => Some(Self::Advanced),
            _ => None,
        }
    }

    fn audience(self) -> &'static str {
        match self {
            Self::Beginner => "use plain language suitable for a beginner",
            Self::Intermediate => "include technical detail and practical examples",
            Self::Advanced => "go deep into underlying principles and implementation details",
        }
    }
}

pub struct ExplainConceptPrompt;

impl ExplainConceptPrompt {
    pub fn descriptor() -> Prompt {
        Prompt {
            name: "explainConcept".into(),
            description: Some("Ask for an explanation of a concept".into()),
            arguments: Some(vec![
                argument("concept", "Concept to explain", true),
                argument(
                    "level",
                    "Depth of the explanation (beginner, intermediate, advanced)",
                    false,
                ),
            ]),
        }
    }
}

#[async_trait]
impl PromptHandler for ExplainConceptPrompt {
    async fn render(&self, arguments: &PromptArguments) -> HandlerResult<GetPromptResult> {
        let concept = required(arguments, "concept")?;
        let level = match arguments.get("level") {
            Some(raw) => Level::parse(raw).ok_or_else(|| {
                ToolError::InvalidArguments(format!(
                    "level must be one of beginner, intermediate, advanced; got '{raw}'"
                ))
            })?,
            None => Level::default(),
        };

        let text = format!(
            "Please explain the concept \"{concept}\".\n\nAudience: {}",
            level.audience()
        );

        Ok(GetPromptResult {
            description: Some(format!("Explanation of {concept}")),
            messages: vec![PromptMessage::user(text)],
        })
    }
}

pub fn register(builder: &mut RegistryBuilder) -> RegistryResult<()> {
    builder
        .register_prompt(CodeReviewPrompt::descriptor(), CodeReviewPrompt)?
        .register_prompt(ExplainConceptPrompt::descriptor(), ExplainConceptPrompt)?;
    Ok(())
}
