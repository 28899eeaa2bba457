use std::collections::{BTreeSet, HashMap};
use std::sync::OnceLock;

use ferrochain_core::{value_to_text, FerroError, Value};
use regex::{Captures, Regex};

fn placeholder_pattern() -> Result<&'static Regex, FerroError> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\{\{\s*(\w+)\s*\}\}"))
        .as_ref()
        .map_err(|e| FerroError::InvalidConfig(e.to_string()))
}

/// Text template with `{{ name }}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn new(template: String) -> Self {
        Self { template }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Names of every placeholder, sorted and deduplicated.
    pub fn input_variables(&self) -> Result<BTreeSet<String>, FerroError> {
        let pattern = placeholder_pattern()?;
        Ok(pattern
            .captures_iter(&self.template)
            .map(|caps| caps[1].to_string())
            .collect())
    }

    pub fn has_variable(&self, name: &str) -> Result<bool, FerroError> {
        Ok(self.input_variables()?.contains(name))
    }

    /// Substitutes every placeholder; unknown names render as empty text.
    pub fn render(&self, vars: &HashMap<String, Value>) -> Result<String, FerroError> {
        let pattern = placeholder_pattern()?;
        let rendered = pattern.replace_all(&self.template, |caps: &Captures| {
            vars.get(&caps[1]).map(value_to_text).unwrap_or_default()
        });
        Ok(rendered.into_owned())
    }

    /// Appends text to the end of the template.
    pub fn append(&self, suffix: &str) -> PromptTemplate {
        PromptTemplate::new(format!("{}{}", self.template, suffix))
    }
}
