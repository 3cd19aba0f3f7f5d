//! Prompt rendering and structured-response parsing.
//!
//! User prompts are Handlebars templates filled with task fields. Model responses
//! carry a `<discussion>` block and a `<predictions>` block holding one JSON object
//! per line.

use handlebars::Handlebars;
use regex::Regex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::LazyLock;

use crate::brain::ChatMessage;
use crate::config::PromptConfig;
use crate::error::{BenchError, Result};

static DISCUSSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<discussion>(.*?)</discussion>").unwrap());
static PREDICTIONS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<predictions>(.*?)</predictions>").unwrap());

const USER_TEMPLATE: &str = "user";

/// Renders the system/user message pair for one task.
pub struct PromptRenderer {
    system: String,
    registry: Handlebars<'static>,
}

impl PromptRenderer {
    pub fn new(prompts: &PromptConfig) -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);
        // Prompts are plain text, not HTML
        registry.register_escape_fn(handlebars::no_escape);
        registry
            .register_template_string(USER_TEMPLATE, &prompts.user)
            .map_err(|e| BenchError::Prompt {
                message: format!("Invalid user prompt template: {}", e),
            })?;
        Ok(Self {
            system: prompts.system.clone(),
            registry,
        })
    }

    pub fn render_user<T: Serialize>(&self, vars: &T) -> Result<String> {
        self.registry
            .render(USER_TEMPLATE, vars)
            .map_err(|e| BenchError::Prompt {
                message: format!("Template render error: {}", e),
            })
    }

    /// System message followed by the rendered user message.
    pub fn messages<T: Serialize>(&self, vars: &T) -> Result<Vec<ChatMessage>> {
        Ok(vec![
            ChatMessage::system(self.system.clone()),
            ChatMessage::user(self.render_user(vars)?),
        ])
    }
}

/// The two blocks of a structured model response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaggedResponse {
    pub discussion: String,
    /// Non-empty lines of the predictions block.
    pub predictions: Vec<String>,
}

/// Extract the discussion and prediction lines. Missing blocks yield empty values.
pub fn parse_tagged_response(text: &str) -> TaggedResponse {
    let discussion = DISCUSSION_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();
    let predictions = PREDICTIONS_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| {
            m.as_str()
                .trim()
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    TaggedResponse {
        discussion,
        predictions,
    }
}

/// Deserialize each prediction line. The first bad line fails the whole response.
pub fn parse_prediction_lines<T: DeserializeOwned>(lines: &[String]) -> Result<Vec<T>> {
    lines
        .iter()
        .enumerate()
        .map(|(idx, line)| {
            serde_json::from_str(line).map_err(|e| BenchError::Prompt {
                message: format!("Prediction line {} is not valid: {}", idx + 1, e),
            })
        })
        .collect()
}
