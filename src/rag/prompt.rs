use crate::llm::ChatMessage;

use super::chain::Document;

pub const RAG_PROMPT_TEMPLATE: &str = "You are an assistant for question-answering tasks.
Use the following pieces of retrieved context to answer the question.
If you don't know the answer, just say that you don't know.
Use three sentences maximum and keep the answer concise.

Context: {context}

Question: {question}

Helpful Answer:";

/// Fixed template with `{context}` and `{question}` slots, rendered as one user turn.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(RAG_PROMPT_TEMPLATE)
    }
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn render(&self, documents: &[Document], question: &str) -> Vec<ChatMessage> {
        let context = format_context(documents);
        let content = fill_slots(
            &self.template,
            &[("context", context.as_str()), ("question", question)],
        );
        vec![ChatMessage::user(content)]
    }
}

/// Joins retrieved chunks with blank lines.
pub fn format_context(documents: &[Document]) -> String {
    documents
        .iter()
        .map(|d| d.page_content.trim())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

// Single pass, so braces inside substituted values are never re-expanded.
fn fill_slots(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let slot = after
            .find('}')
            .map(|close| (&after[..close], close))
            .and_then(|(name, close)| {
                values
                    .iter()
                    .find(|(key, _)| *key == name)
                    .map(|(_, value)| (*value, close))
            });
        match slot {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
