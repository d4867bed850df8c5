//! Prompt construction for retrieval-augmented questions

/// Separator placed between retrieved documents in the context block
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Default system instruction for `ask`
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are a helpful assistant. \
Answer the question using only the provided context. \
If the context does not contain the answer, say that you don't know.";

/// Builder for constructing RAG prompts
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    context_sections: Vec<String>,
    question: String,
}

impl PromptBuilder {
    /// Create a new prompt builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a context section
    pub fn add_context(mut self, context: impl Into<String>) -> Self {
        self.context_sections.push(context.into());
        self
    }

    /// Set the question
    pub fn question(mut self, q: impl Into<String>) -> Self {
        self.question = q.into();
        self
    }

    /// Build the user prompt
    pub fn build(self) -> String {
        let mut prompt = String::new();

        if !self.context_sections.is_empty() {
            prompt.push_str("<context>\n");
            prompt.push_str(&self.context_sections.join(CONTEXT_SEPARATOR));
            prompt.push_str("\n</context>\n\n");
        }

        if !self.question.is_empty() {
            prompt.push_str("<question>\n");
            prompt.push_str(&self.question);
            prompt.push_str("\n</question>\n");
        }

        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_builder() {
        let prompt = PromptBuilder::new()
            .add_context("Paris is the capital of France.")
            .add_context("Berlin is the capital of Germany.")
            .question("What is the capital of France?")
            .build();

        assert!(prompt.starts_with("<context>\nParis is the capital of France.\n\nBerlin"));
        assert!(prompt.contains("<question>\nWhat is the capital of France?\n</question>"));
        assert!(prompt.ends_with("</question>\n"));
    }

    #[test]
    fn test_empty_sections_are_omitted() {
        let prompt = PromptBuilder::new().question("Anything?").build();
        assert!(!prompt.contains("<context>"));
        assert_eq!(prompt, "<question>\nAnything?\n</question>\n");
    }
}
