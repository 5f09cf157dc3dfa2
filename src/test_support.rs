//! In-memory stand-ins for the hosted collaborators, shared by unit tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::config::Credentials;
use crate::document::PageUnit;
use crate::llm::retriever::page_metadata;
use crate::llm::Retriever;
use crate::providers::traits::{
    CompletionProvider, DocumentLoader, EmbeddingProvider, VectorMatch, VectorRecord, VectorStore,
};
use crate::workflow::ServiceFactory;

/// Emits `pages` units reading "Page N of <source>".
#[derive(Default)]
pub struct FakeLoader {
    pages: usize,
    failure: Mutex<Option<String>>,
    seen_paths: Mutex<Vec<PathBuf>>,
    seen_contents: Mutex<Vec<Vec<u8>>>,
}

impl FakeLoader {
    pub fn with_pages(pages: usize) -> Self {
        Self {
            pages,
            ..Default::default()
        }
    }

    pub fn failing(message: &str) -> Self {
        let loader = Self::default();
        loader.fail_with(message);
        loader
    }

    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn call_count(&self) -> usize {
        self.seen_paths.lock().unwrap().len()
    }

    pub fn seen_paths(&self) -> Vec<PathBuf> {
        self.seen_paths.lock().unwrap().clone()
    }

    pub fn seen_contents(&self) -> Vec<Vec<u8>> {
        self.seen_contents.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentLoader for FakeLoader {
    async fn load_and_split(&self, path: &Path, source: &str) -> Result<Vec<PageUnit>> {
        self.seen_paths.lock().unwrap().push(path.to_path_buf());
        self.seen_contents
            .lock()
            .unwrap()
            .push(std::fs::read(path).unwrap_or_default());

        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(anyhow!(message));
        }

        Ok((0..self.pages)
            .map(|i| PageUnit::new(format!("Page {} of {}", i + 1, source), source, i as u32))
            .collect())
    }
}

/// Deterministic vectors of a fixed dimension.
pub struct FakeEmbedder {
    dimension: usize,
    failure: Mutex<Option<String>>,
    document_calls: Mutex<Vec<usize>>,
    query_calls: Mutex<usize>,
}

impl FakeEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            failure: Mutex::new(None),
            document_calls: Mutex::new(Vec::new()),
            query_calls: Mutex::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        let embedder = Self::new(4);
        embedder.fail_with(message);
        embedder
    }

    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    /// Batch sizes of each `embed_documents` call.
    pub fn document_calls(&self) -> Vec<usize> {
        self.document_calls.lock().unwrap().clone()
    }

    pub fn query_calls(&self) -> usize {
        *self.query_calls.lock().unwrap()
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let seed = text.len() as f32;
        (0..self.dimension).map(|i| (seed + i as f32) / 100.0).collect()
    }

    fn check(&self) -> Result<()> {
        match self.failure.lock().unwrap().clone() {
            Some(message) => Err(anyhow!(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.check()?;
        self.document_calls.lock().unwrap().push(texts.len());
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.check()?;
        *self.query_calls.lock().unwrap() += 1;
        Ok(self.vector_for(text))
    }
}

/// Keeps records per index; queries return them in insertion order.
#[derive(Default)]
pub struct FakeVectorStore {
    indexes: Mutex<HashMap<String, Vec<VectorRecord>>>,
    ensured: Mutex<Vec<(String, u64)>>,
    upsert_calls: Mutex<usize>,
    query_calls: Mutex<Vec<(String, u64)>>,
    upsert_failure: Option<String>,
}

impl FakeVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_upsert(message: &str) -> Self {
        Self {
            upsert_failure: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn seed(&self, index_name: &str, pages: Vec<PageUnit>) {
        let records = pages
            .iter()
            .enumerate()
            .map(|(i, page)| VectorRecord {
                id: format!("seed-{}", i),
                values: Vec::new(),
                metadata: page_metadata(page),
            })
            .collect();
        self.indexes
            .lock()
            .unwrap()
            .insert(index_name.to_string(), records);
    }

    pub fn ensured(&self) -> Vec<(String, u64)> {
        self.ensured.lock().unwrap().clone()
    }

    pub fn upsert_calls(&self) -> usize {
        *self.upsert_calls.lock().unwrap()
    }

    pub fn query_calls(&self) -> Vec<(String, u64)> {
        self.query_calls.lock().unwrap().clone()
    }

    pub fn records(&self, index_name: &str) -> Vec<VectorRecord> {
        self.indexes
            .lock()
            .unwrap()
            .get(index_name)
            .cloned()
            .unwrap_or_default()
    }

    pub fn upserted_count(&self, index_name: &str) -> usize {
        self.records(index_name).len()
    }
}

#[async_trait]
impl VectorStore for FakeVectorStore {
    async fn ensure_index(&self, index_name: &str, dimension: u64) -> Result<()> {
        self.ensured
            .lock()
            .unwrap()
            .push((index_name.to_string(), dimension));
        Ok(())
    }

    async fn upsert(&self, index_name: &str, records: Vec<VectorRecord>) -> Result<usize> {
        if let Some(message) = &self.upsert_failure {
            return Err(anyhow!(message.clone()));
        }
        *self.upsert_calls.lock().unwrap() += 1;
        let count = records.len();
        self.indexes
            .lock()
            .unwrap()
            .entry(index_name.to_string())
            .or_default()
            .extend(records);
        Ok(count)
    }

    async fn query(
        &self,
        index_name: &str,
        _vector: Vec<f32>,
        top_k: u64,
    ) -> Result<Vec<VectorMatch>> {
        self.query_calls
            .lock()
            .unwrap()
            .push((index_name.to_string(), top_k));

        Ok(self
            .records(index_name)
            .into_iter()
            .take(top_k as usize)
            .enumerate()
            .map(|(rank, record)| VectorMatch {
                id: record.id,
                score: 1.0 - rank as f32 / 10.0,
                metadata: record.metadata,
            })
            .collect())
    }
}

/// Returns a fixed answer and records (system prompt, user prompt) pairs.
pub struct FakeLlm {
    answer: String,
    failure: Mutex<Option<String>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl FakeLlm {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            failure: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        let llm = Self::answering("");
        llm.fail_with(message);
        llm
    }

    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn recover(&self) {
        *self.failure.lock().unwrap() = None;
    }

    /// Successful calls only.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for FakeLlm {
    async fn complete(&self, system_message: &str, prompt: &str) -> Result<String> {
        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(anyhow!(message));
        }
        self.calls
            .lock()
            .unwrap()
            .push((system_message.to_string(), prompt.to_string()));
        Ok(self.answer.clone())
    }
}

pub struct FakeRetriever {
    index_name: String,
    pages: Vec<PageUnit>,
    queries: Mutex<Vec<String>>,
}

impl FakeRetriever {
    pub fn new(index_name: &str, pages: Vec<PageUnit>) -> Self {
        Self {
            index_name: index_name.to_string(),
            pages,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl Retriever for FakeRetriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<PageUnit>> {
        self.queries.lock().unwrap().push(query.to_string());
        Ok(self.pages.clone())
    }

    fn index_name(&self) -> &str {
        &self.index_name
    }
}

/// A full set of fakes behind the service factory; clones share state.
#[derive(Clone)]
pub struct FakeServices {
    pub loader: Arc<FakeLoader>,
    pub embedder: Arc<FakeEmbedder>,
    pub store: Arc<FakeVectorStore>,
    pub llm: Arc<FakeLlm>,
}

impl FakeServices {
    pub fn new(pages: usize, answer: &str) -> Self {
        Self {
            loader: Arc::new(FakeLoader::with_pages(pages)),
            embedder: Arc::new(FakeEmbedder::new(8)),
            store: Arc::new(FakeVectorStore::new()),
            llm: Arc::new(FakeLlm::answering(answer)),
        }
    }

    pub fn assert_no_calls(&self) {
        assert_eq!(self.loader.call_count(), 0, "loader was called");
        assert!(self.embedder.document_calls().is_empty(), "embedder was called");
        assert_eq!(self.embedder.query_calls(), 0, "embedder was queried");
        assert!(self.store.ensured().is_empty(), "vector store was prepared");
        assert_eq!(self.store.upsert_calls(), 0, "vector store was written");
        assert!(self.store.query_calls().is_empty(), "vector store was queried");
        assert!(self.llm.calls().is_empty(), "llm was called");
    }
}

impl ServiceFactory for FakeServices {
    fn loader(&self) -> Arc<dyn DocumentLoader> {
        self.loader.clone()
    }

    fn embedder(&self, _credentials: &Credentials) -> Result<Arc<dyn EmbeddingProvider>> {
        Ok(self.embedder.clone())
    }

    fn vector_store(&self, _credentials: &Credentials) -> Result<Arc<dyn VectorStore>> {
        Ok(self.store.clone())
    }

    fn llm(&self, _credentials: &Credentials) -> Result<Arc<dyn CompletionProvider>> {
        Ok(self.llm.clone())
    }

    fn top_k(&self) -> u64 {
        4
    }
}
