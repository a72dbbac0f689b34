//! Chat orchestration: retrieval, prompt assembly, and answer generation.
//!
//! Every outcome is an in-band answer string — the chat endpoint always
//! returns 200 so the frontend renders failures as messages. Two
//! short-circuits avoid wasted LLM calls: an empty registry and a query with
//! no relevant content. A generation failure still reports that relevant
//! content was found.

use anyhow::Result;

use crate::llm::AnswerGenerator;
use crate::models::SearchHit;
use crate::registry::DocumentRegistry;
use crate::search::SearchFacade;

pub const NO_DOCUMENTS_ANSWER: &str =
    "No documents have been uploaded yet. Please upload some documents first!";

pub const NO_RELEVANT_ANSWER: &str =
    "I couldn't find any relevant information in the uploaded documents for your question.";

pub const INTERNAL_ERROR_ANSWER: &str =
    "I'm sorry, I encountered an error while processing your question. Please try again.";

/// Answer a question against the uploaded corpus. Infallible by design:
/// every failure mode maps to an explanatory answer string.
pub async fn answer_question(
    registry: &DocumentRegistry,
    facade: &SearchFacade,
    generator: &dyn AnswerGenerator,
    question: &str,
) -> String {
    if registry.is_empty() {
        return NO_DOCUMENTS_ANSWER.to_string();
    }

    let hits = match facade.search(question).await {
        Ok(hits) => hits,
        Err(e) => {
            tracing::error!(error = %e, "search failed");
            return INTERNAL_ERROR_ANSWER.to_string();
        }
    };

    if hits.is_empty() {
        return NO_RELEVANT_ANSWER.to_string();
    }

    match generate(generator, &hits, question).await {
        Ok(answer) => answer,
        Err(e) => {
            tracing::error!(error = %e, "answer generation failed");
            format!(
                "I found relevant information in the documents, but encountered an error \
                 generating the response: {}",
                e
            )
        }
    }
}

async fn generate(
    generator: &dyn AnswerGenerator,
    hits: &[SearchHit],
    question: &str,
) -> Result<String> {
    let context = hits
        .iter()
        .map(|h| h.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    generator.answer(&context, question).await
}
