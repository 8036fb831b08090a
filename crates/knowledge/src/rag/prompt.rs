//! Prompt construction for grounded answers.

use crate::types::AnswerConfig;

/// Best similarity under which the model is told the context may be off-topic.
pub const CONFIDENCE_THRESHOLD: f32 = 0.30;

/// Build the single prompt sent to the generation model.
///
/// The retrieved chunks become the context block, followed by the question
/// and the answering rules. `best_similarity` below [`CONFIDENCE_THRESHOLD`]
/// adds a caution line.
pub fn build_prompt(
    contexts: &[String],
    query: &str,
    best_similarity: f32,
    answer: &AnswerConfig,
) -> String {
    let mut prompt = format!(
        "You are the assistant of {}. Answer the question using the knowledge base excerpts below.\n\n",
        answer.assistant_name
    );

    prompt.push_str("KNOWLEDGE BASE:\n");
    prompt.push_str(&build_context(contexts));
    prompt.push_str("\n\nQUESTION:\n");
    prompt.push_str(query.trim());
    prompt.push_str("\n\n");

    if best_similarity < CONFIDENCE_THRESHOLD {
        prompt.push_str(
            "Note: the excerpts may not directly answer this question. \
             Be clear about what they do and do not state.\n\n",
        );
    }

    prompt.push_str(&format!(
        "INSTRUCTIONS:\n\
         - Answer in the language of the question.\n\
         - Use only facts stated in the knowledge base excerpts.\n\
         - If the excerpts do not contain the answer, say so plainly and suggest contacting {}.\n\
         - Do not mention excerpts, documents or the knowledge base itself.\n\
         - Do not add greetings or sign-offs; keep the answer short and factual.\n\n\
         ANSWER:",
        answer.fallback_contact
    ));

    prompt
}

/// Join chunk texts into one context block.
fn build_context(contexts: &[String]) -> String {
    contexts
        .iter()
        .map(|text| text.trim())
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}
