use anyhow::{Context, Result};

use super::retriever::Retriever;
use crate::document::PageUnit;
use crate::providers::traits::CompletionProvider;

const STUFF_SYSTEM_TEMPLATE: &str = "Use the following pieces of context to answer the user's question. \n\
If you don't know the answer, just say that you don't know, don't try to make up an answer.\n\
----------------\n";

/// Every retrieved chunk, verbatim and in retrieval order, in one context.
pub fn stuff_context(pages: &[PageUnit]) -> String {
    pages
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn stuff_system_prompt(pages: &[PageUnit]) -> String {
    format!("{}{}", STUFF_SYSTEM_TEMPLATE, stuff_context(pages))
}

/// Retrieval-augmented answer: retrieve, stuff, complete.
pub async fn answer_query(
    query: &str,
    retriever: &dyn Retriever,
    llm: &dyn CompletionProvider,
) -> Result<String> {
    let pages = retriever
        .retrieve(query)
        .await
        .context("Failed to retrieve context")?;

    log::info!(
        "Answering with {} retrieved chunks from '{}'",
        pages.len(),
        retriever.index_name()
    );

    let system_prompt = stuff_system_prompt(&pages);
    llm.complete(&system_prompt, query).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeLlm, FakeRetriever};

    #[test]
    fn test_stuff_prompt_contains_every_chunk_in_order() {
        let pages = vec![
            PageUnit::new("Refunds are issued within 30 days.", "doc.pdf", 1),
            PageUnit::new("Store credit never expires.", "doc.pdf", 0),
        ];

        let prompt = stuff_system_prompt(&pages);

        assert!(prompt.starts_with("Use the following pieces of context"));
        assert!(prompt.ends_with(
            "----------------\nRefunds are issued within 30 days.\n\nStore credit never expires."
        ));
    }

    #[tokio::test]
    async fn test_answer_passes_query_and_context_to_llm() {
        let retriever = FakeRetriever::new(
            "manuals",
            vec![PageUnit::new("Refunds are issued within 30 days.", "doc.pdf", 0)],
        );
        let llm = FakeLlm::answering("Refunds are issued within 30 days of purchase.");

        let answer = answer_query("What is the refund policy?", &retriever, &llm)
            .await
            .unwrap();

        assert_eq!(answer, "Refunds are issued within 30 days of purchase.");
        let calls = llm.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].0.contains("Refunds are issued within 30 days."));
        assert_eq!(calls[0].1, "What is the refund policy?");
        assert_eq!(retriever.queries(), vec!["What is the refund policy?".to_string()]);
    }

    #[tokio::test]
    async fn test_llm_failure_is_propagated() {
        let retriever = FakeRetriever::new("manuals", Vec::new());
        let llm = FakeLlm::failing("rate limit reached");

        let err = answer_query("anything", &retriever, &llm).await.unwrap_err();

        assert!(err.to_string().contains("rate limit reached"));
    }
}
