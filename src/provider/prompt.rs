// src/provider/prompt.rs — Generation prompt templates
//
// Renders the system and user prompts handed to a producer backend. The retry
// variant embeds the directive verbatim under its own heading.

use minijinja::{context, Environment};

use crate::infra::errors::WorkflowError;

pub const SYSTEM_PROMPT: &str = "You are an expert software engineer who writes efficient, \
readable, well-tested and maintainable functions. Respond with a single JSON object \
containing: function_name, code, explanation, dependencies, test_code, usage_examples.";

const INITIAL_TEMPLATE: &str = r#"Write a function that performs the following: {{ task }}

Requirements:
- Validate inputs and handle errors explicitly
- Add type annotations for every parameter and return value
- Document the function with a docstring that includes examples
- Provide unit tests covering normal operation, edge cases and error conditions
- Declare every dependency as an import statement
- Provide at least two usage examples"#;

const RETRY_TEMPLATE: &str = r#"Write a function that performs the following: {{ task }}

This is a retry. The previous candidate was rejected by the quality gate.

## Feedback from the previous attempt
{{ directive }}

Fix every CRITICAL item first, then the WARNING items. Keep everything that already
passed: type annotations, docstring, tests, declared dependencies and usage examples."#;

/// Prompt renderer with the templates preloaded.
pub struct PromptBuilder {
    env: Environment<'static>,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptBuilder {
    pub fn new() -> Self {
        let mut env = Environment::new();
        if let Err(e) = env.add_template("initial", INITIAL_TEMPLATE) {
            tracing::error!("Invalid built-in template 'initial': {}", e);
        }
        if let Err(e) = env.add_template("retry", RETRY_TEMPLATE) {
            tracing::error!("Invalid built-in template 'retry': {}", e);
        }
        Self { env }
    }

    /// Render the user prompt; the retry variant is used when a directive is given.
    pub fn render(&self, task: &str, retry_directive: Option<&str>) -> Result<String, WorkflowError> {
        let rendered = match retry_directive {
            Some(directive) => self
                .env
                .get_template("retry")
                .and_then(|t| t.render(context! { task, directive })),
            None => self
                .env
                .get_template("initial")
                .and_then(|t| t.render(context! { task })),
        };
        rendered.map_err(|e| WorkflowError::Other(anyhow::anyhow!("prompt rendering failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_prompt_contains_task() {
        let p = PromptBuilder::new()
            .render("compute a factorial", None)
            .unwrap();
        assert!(p.starts_with("Write a function that performs the following: compute a factorial"));
        assert!(p.contains("usage examples"));
        assert!(!p.contains("Feedback from the previous attempt"));
    }

    #[test]
    fn test_retry_prompt_embeds_directive_verbatim() {
        let directive = "1. [CRITICAL] (security) eval() function detected";
        let p = PromptBuilder::new()
            .render("parse a CSV file", Some(directive))
            .unwrap();
        assert!(p.contains("This is a retry."));
        assert!(p.contains(directive));
    }

    #[test]
    fn test_retry_prompt_does_not_escape_symbols() {
        let directive = "1. [WARNING] (style) use 'with open()' & <context> managers";
        let p = PromptBuilder::new()
            .render("t", Some(directive))
            .unwrap();
        assert!(p.contains("'with open()' & <context>"));
    }
}
