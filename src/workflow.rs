use anyhow::Result;
use log::{error, info, warn};
use std::sync::Arc;
use validator::{Validate, ValidationErrors};

use crate::config::{AppConfig, Credentials, VectorBackend};
use crate::database::VectorDB;
use crate::document::{ingest_document, UploadedDocument};
use crate::error::{QaError, QaResult};
use crate::llm::{answer_query, build_index, Retriever};
use crate::providers::cohere::CohereEmbeddings;
use crate::providers::document::PdfLoader;
use crate::providers::groq::GroqProvider;
use crate::providers::pinecone::PineconeStore;
use crate::providers::traits::{CompletionProvider, DocumentLoader, EmbeddingProvider, VectorStore};
use crate::session::SessionCache;

pub const MISSING_FIELDS_WARNING: &str = "Please upload the document and provide the missing fields.";

/// What the user filled in when pressing submit.
#[derive(Debug, Clone, Default, Validate)]
pub struct SubmitForm {
    #[validate(length(min = 1))]
    pub llm_api_key: String,
    pub embedding_api_key: String,
    #[validate(length(min = 1))]
    pub vector_store_api_key: String,
    #[validate(length(min = 1))]
    pub index_name: String,
    #[validate(required)]
    pub document: Option<UploadedDocument>,
    #[validate(length(min = 1))]
    pub query: String,
}

impl SubmitForm {
    pub fn new(credentials: Credentials, document: Option<UploadedDocument>, query: impl Into<String>) -> Self {
        Self {
            llm_api_key: credentials.llm_api_key,
            embedding_api_key: credentials.embedding_api_key,
            vector_store_api_key: credentials.vector_store_api_key,
            index_name: credentials.index_name,
            document,
            query: query.into(),
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            llm_api_key: self.llm_api_key.clone(),
            embedding_api_key: self.embedding_api_key.clone(),
            vector_store_api_key: self.vector_store_api_key.clone(),
            index_name: self.index_name.clone(),
        }
    }
}

/// Form label shown for a struct field.
pub fn field_label(field: &str) -> &'static str {
    match field {
        "llm_api_key" => "Groq API key",
        "embedding_api_key" => "Cohere API key",
        "vector_store_api_key" => "Pinecone API key",
        "index_name" => "Pinecone index name",
        "document" => "Source document",
        "query" => "Query",
        _ => "Unknown field",
    }
}

fn missing_fields(errors: &ValidationErrors) -> Vec<&'static str> {
    let mut labels: Vec<&'static str> = errors
        .field_errors()
        .keys()
        .map(|field| field_label(field))
        .collect();
    labels.sort_unstable();
    labels
}

fn missing_fields_warning(labels: &[&str]) -> String {
    format!("{} Missing: {}", MISSING_FIELDS_WARNING, labels.join(", "))
}

/// Banner shown after a submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success(String),
    Warning(String),
    Error(String),
}

impl Outcome {
    pub fn message(&self) -> &str {
        match self {
            Outcome::Success(m) | Outcome::Warning(m) | Outcome::Error(m) => m,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }
}

/// Builds the collaborators for one submit from the user's credentials.
pub trait ServiceFactory: Send + Sync {
    fn loader(&self) -> Arc<dyn DocumentLoader>;

    fn embedder(&self, credentials: &Credentials) -> Result<Arc<dyn EmbeddingProvider>>;

    fn vector_store(&self, credentials: &Credentials) -> Result<Arc<dyn VectorStore>>;

    fn llm(&self, credentials: &Credentials) -> Result<Arc<dyn CompletionProvider>>;

    fn top_k(&self) -> u64;
}

/// The hosted stack: PDF loader, Cohere, Pinecone or Qdrant, Groq.
#[derive(Clone)]
pub struct HostedServices {
    config: AppConfig,
    loader: Arc<PdfLoader>,
}

impl HostedServices {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            loader: Arc::new(PdfLoader::default()),
        }
    }
}

impl ServiceFactory for HostedServices {
    fn loader(&self) -> Arc<dyn DocumentLoader> {
        self.loader.clone()
    }

    fn embedder(&self, credentials: &Credentials) -> Result<Arc<dyn EmbeddingProvider>> {
        Ok(Arc::new(CohereEmbeddings::new(
            &credentials.embedding_api_key,
            &self.config.cohere,
        )))
    }

    fn vector_store(&self, credentials: &Credentials) -> Result<Arc<dyn VectorStore>> {
        match self.config.vector_backend {
            VectorBackend::Pinecone => Ok(Arc::new(PineconeStore::new(
                &credentials.vector_store_api_key,
                &self.config,
            )?)),
            VectorBackend::Qdrant => Ok(Arc::new(VectorDB::new(
                &self.config.qdrant.api_url,
                &credentials.vector_store_api_key,
            )?)),
        }
    }

    fn llm(&self, credentials: &Credentials) -> Result<Arc<dyn CompletionProvider>> {
        Ok(Arc::new(GroqProvider::new(
            &credentials.llm_api_key,
            &self.config.groq,
        )))
    }

    fn top_k(&self) -> u64 {
        self.config.top_k
    }
}

/// Validate, ingest and index when the document changed, then answer.
pub struct QaWorkflow<F: ServiceFactory> {
    services: F,
}

impl<F: ServiceFactory> QaWorkflow<F> {
    pub fn new(services: F) -> Self {
        Self { services }
    }

    pub async fn submit(&self, cache: &mut SessionCache, form: &SubmitForm) -> Outcome {
        if let Err(errors) = form.validate() {
            let missing = missing_fields(&errors);
            warn!("Submit rejected, missing fields: {}", missing.join(", "));
            return Outcome::Warning(missing_fields_warning(&missing));
        }
        let Some(document) = form.document.as_ref() else {
            return Outcome::Warning(missing_fields_warning(&[field_label("document")]));
        };

        let credentials = form.credentials();

        if cache.matches(document) {
            info!("Reusing retriever for document {}", document.id());
        } else {
            match self.index_document(document, &credentials).await {
                Ok(retriever) => cache.replace(document, retriever),
                Err(e) => {
                    error!("Indexing '{}' failed: {}", document.file_name(), e);
                    return Outcome::Error(e.banner());
                }
            }
        }

        let Some(retriever) = cache.current() else {
            return Outcome::Error(QaError::new("No document has been indexed").banner());
        };

        match self.answer(&form.query, retriever.as_ref(), &credentials).await {
            Ok(answer) => Outcome::Success(answer),
            Err(e) => {
                error!("Answering failed: {}", e);
                Outcome::Error(e.banner())
            }
        }
    }

    async fn index_document(
        &self,
        document: &UploadedDocument,
        credentials: &Credentials,
    ) -> QaResult<Arc<dyn Retriever>> {
        info!(
            "Indexing '{}' ({} bytes) into '{}'",
            document.file_name(),
            document.len(),
            credentials.index_name
        );

        let loader = self.services.loader();
        let pages = ingest_document(document, loader.as_ref()).await?;

        let embedder = self.services.embedder(credentials)?;
        let store = self.services.vector_store(credentials)?;
        let retriever = build_index(
            pages,
            &credentials.index_name,
            embedder,
            store,
            self.services.top_k(),
        )
        .await?;

        Ok(retriever)
    }

    async fn answer(
        &self,
        query: &str,
        retriever: &dyn Retriever,
        credentials: &Credentials,
    ) -> QaResult<String> {
        let llm = self.services.llm(credentials)?;
        Ok(answer_query(query, retriever, llm.as_ref()).await?)
    }
}
