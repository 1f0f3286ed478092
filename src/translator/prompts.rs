/*!
 * Prompt templates for natural-language to SQL translation.
 */

use crate::app_config::EngineKind;

/// System instruction template with a `{dialect}` placeholder
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// The template string with placeholders
    template: String,
}

impl PromptTemplate {
    /// Create a new prompt template
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    /// Render the template for a target engine
    pub fn render(&self, dialect: EngineKind) -> String {
        self.template.replace("{dialect}", dialect.display_name())
    }
}

/// Build the user prompt
///
/// Sections appear in a fixed order so identical inputs give identical
/// prompts: schema, then literal details when present, then the question.
pub fn user_prompt(schema_text: &str, question: &str, details: Option<&str>) -> String {
    let mut prompt = String::with_capacity(schema_text.len() + question.len() + 128);
    prompt.push_str("Use this database schema:\n");
    prompt.push_str(schema_text);

    if let Some(details) = details.map(str::trim).filter(|d| !d.is_empty()) {
        prompt.push_str("\nUse these literal values where the statement needs them:\n");
        prompt.push_str(details);
        prompt.push('\n');
    }

    prompt.push_str("\nTranslate the following natural language question into SQL:\n");
    prompt.push_str("Question: ");
    prompt.push_str(question.trim());
    prompt.push_str("\nSQL:");
    prompt
}
