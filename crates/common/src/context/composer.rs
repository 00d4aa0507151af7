//! Context composer: retrieved body + question into the completion prompt

/// Answer returned when nothing relevant is stored
pub const NO_MATCH_ANSWER: &str = "I'm sorry, I couldn't find relevant information.";

/// What to do with a question after retrieval
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Composition {
    /// Send this prompt to the completion provider
    Prompt(String),
    /// Skip the completion and answer directly
    Answer(String),
}

/// Fixed two-part template: context first, then the question
pub fn compose_prompt(context: &str, question: &str) -> String {
    format!("Context: {}\n\nQuestion: {}", context, question)
}

pub fn compose(retrieved: Option<&str>, question: &str) -> Composition {
    match retrieved {
        Some(context) => Composition::Prompt(compose_prompt(context, question)),
        None => Composition::Answer(NO_MATCH_ANSWER.to_string()),
    }
}
