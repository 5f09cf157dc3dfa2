use std::env;
use std::fmt;

/// The four values the user types into the settings form.
///
/// Held in memory for the lifetime of a submit (or a terminal session) and
/// passed explicitly to every collaborator. Never written to disk.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub llm_api_key: String,
    pub embedding_api_key: String,
    pub vector_store_api_key: String,
    pub index_name: String,
}

impl Credentials {
    /// Initial form values taken from the process environment (and `.env`).
    ///
    /// Missing variables yield empty fields; the submit-time presence check
    /// decides whether anything is usable.
    pub fn from_env() -> Self {
        Self {
            llm_api_key: env::var("GROQ_API_KEY").unwrap_or_default(),
            embedding_api_key: env::var("COHERE_API_KEY").unwrap_or_default(),
            vector_store_api_key: env::var("PINECONE_API_KEY").unwrap_or_default(),
            index_name: env::var("PINECONE_INDEX").unwrap_or_default(),
        }
    }

    /// Fills every blank field from `fallback`.
    pub fn or(self, fallback: &Credentials) -> Credentials {
        let pick = |value: String, fallback: &str| {
            if value.is_empty() {
                fallback.to_string()
            } else {
                value
            }
        };

        Credentials {
            llm_api_key: pick(self.llm_api_key, &fallback.llm_api_key),
            embedding_api_key: pick(self.embedding_api_key, &fallback.embedding_api_key),
            vector_store_api_key: pick(self.vector_store_api_key, &fallback.vector_store_api_key),
            index_name: pick(self.index_name, &fallback.index_name),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("llm_api_key", &mask_secret(&self.llm_api_key))
            .field("embedding_api_key", &mask_secret(&self.embedding_api_key))
            .field("vector_store_api_key", &mask_secret(&self.vector_store_api_key))
            .field("index_name", &self.index_name)
            .finish()
    }
}

/// Renders a secret as `<unset>` or `****` plus its last four characters.
pub fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return "<unset>".to_string();
    }
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub model: String,
    pub api_url: String,
    pub temperature: f32,
}

impl ProviderConfig {
    pub fn from_env(provider: &str) -> Self {
        let prefix = provider.to_uppercase();
        let defaults = Self::defaults(provider);

        let model = env::var(format!("{}_MODEL", prefix)).unwrap_or(defaults.model);

        let api_url = env::var(format!("{}_API_URL", prefix)).unwrap_or(defaults.api_url);

        let temperature = env::var(format!("{}_TEMPERATURE", prefix))
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(defaults.temperature);

        Self {
            model,
            api_url,
            temperature,
        }
    }

    pub fn defaults(provider: &str) -> Self {
        let (model, api_url) = match provider {
            "groq" => ("llama3-8b-8192", "https://api.groq.com/openai/v1"),
            "cohere" => ("embed-english-v3.0", "https://api.cohere.com/v1"),
            "pinecone" => ("", "https://api.pinecone.io"),
            "qdrant" => ("", "http://localhost:6333"),
            _ => ("", ""),
        };

        Self {
            model: model.to_string(),
            api_url: api_url.to_string(),
            temperature: 0.7,
        }
    }
}

/// Which remote vector store the index name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorBackend {
    Pinecone,
    Qdrant,
}

impl VectorBackend {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "pinecone" => Some(Self::Pinecone),
            "qdrant" => Some(Self::Qdrant),
            _ => None,
        }
    }
}

impl fmt::Display for VectorBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pinecone => write!(f, "pinecone"),
            Self::Qdrant => write!(f, "qdrant"),
        }
    }
}

/// Retriever top-k used by the stack this app mirrors.
pub const DEFAULT_TOP_K: u64 = 4;

pub const DEFAULT_SESSION_IDLE_MINUTES: i64 = 30;

/// Process-wide settings that are not secrets: models, endpoints, backend.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub groq: ProviderConfig,
    pub cohere: ProviderConfig,
    pub pinecone: ProviderConfig,
    pub pinecone_cloud: String,
    pub pinecone_region: String,
    pub qdrant: ProviderConfig,
    pub vector_backend: VectorBackend,
    pub top_k: u64,
    pub max_upload_bytes: usize,
    /// Web sessions idle longer than this are dropped.
    pub session_idle_minutes: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let vector_backend = match env::var("VECTOR_STORE") {
            Ok(name) => VectorBackend::parse(&name).unwrap_or_else(|| {
                log::warn!("Unknown VECTOR_STORE '{}', falling back to pinecone", name);
                VectorBackend::Pinecone
            }),
            Err(_) => VectorBackend::Pinecone,
        };

        let mut qdrant = ProviderConfig::from_env("qdrant");
        if let Ok(url) = env::var("QDRANT_URL") {
            qdrant.api_url = url;
        }

        let top_k = env::var("RETRIEVER_TOP_K")
            .ok()
            .and_then(|k| k.parse().ok())
            .filter(|k| *k > 0)
            .unwrap_or(DEFAULT_TOP_K);

        let max_upload_mb: usize = env::var("MAX_UPLOAD_MB")
            .ok()
            .and_then(|m| m.parse().ok())
            .unwrap_or(200);

        let session_idle_minutes = env::var("SESSION_IDLE_MINUTES")
            .ok()
            .and_then(|m| m.parse().ok())
            .filter(|m: &i64| *m > 0)
            .unwrap_or(DEFAULT_SESSION_IDLE_MINUTES);

        Self {
            groq: ProviderConfig::from_env("groq"),
            cohere: ProviderConfig::from_env("cohere"),
            pinecone: ProviderConfig::from_env("pinecone"),
            pinecone_cloud: env::var("PINECONE_CLOUD").unwrap_or_else(|_| "aws".to_string()),
            pinecone_region: env::var("PINECONE_REGION")
                .unwrap_or_else(|_| "us-east-1".to_string()),
            qdrant,
            vector_backend,
            top_k,
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            session_idle_minutes,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            groq: ProviderConfig::defaults("groq"),
            cohere: ProviderConfig::defaults("cohere"),
            pinecone: ProviderConfig::defaults("pinecone"),
            pinecone_cloud: "aws".to_string(),
            pinecone_region: "us-east-1".to_string(),
            qdrant: ProviderConfig::defaults("qdrant"),
            vector_backend: VectorBackend::Pinecone,
            top_k: DEFAULT_TOP_K,
            max_upload_bytes: 200 * 1024 * 1024,
            session_idle_minutes: DEFAULT_SESSION_IDLE_MINUTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_masks_secrets() {
        let credentials = Credentials {
            llm_api_key: "gsk_abcdefgh1234".to_string(),
            embedding_api_key: String::new(),
            vector_store_api_key: "abc".to_string(),
            index_name: "manuals".to_string(),
        };

        let rendered = format!("{:?}", credentials);
        assert!(!rendered.contains("gsk_abcdefgh1234"));
        assert!(rendered.contains("****1234"));
        assert!(rendered.contains("<unset>"));
        assert!(rendered.contains("manuals"));
    }

    #[test]
    fn test_blank_fields_fall_back() {
        let posted = Credentials {
            llm_api_key: "gsk_posted".to_string(),
            index_name: "posted-index".to_string(),
            ..Default::default()
        };
        let fallback = Credentials {
            llm_api_key: "gsk_server".to_string(),
            embedding_api_key: "co_server".to_string(),
            vector_store_api_key: "pc_server".to_string(),
            index_name: "server-index".to_string(),
        };

        let merged = posted.or(&fallback);

        assert_eq!(merged.llm_api_key, "gsk_posted");
        assert_eq!(merged.embedding_api_key, "co_server");
        assert_eq!(merged.vector_store_api_key, "pc_server");
        assert_eq!(merged.index_name, "posted-index");
    }

    #[test]
    fn test_provider_defaults() {
        let groq = ProviderConfig::defaults("groq");
        assert_eq!(groq.model, "llama3-8b-8192");
        assert_eq!(groq.api_url, "https://api.groq.com/openai/v1");
        assert!((groq.temperature - 0.7).abs() < f32::EPSILON);

        let cohere = ProviderConfig::defaults("cohere");
        assert_eq!(cohere.model, "embed-english-v3.0");
    }

    #[test]
    fn test_vector_backend_parse() {
        assert_eq!(VectorBackend::parse("Pinecone"), Some(VectorBackend::Pinecone));
        assert_eq!(VectorBackend::parse(" qdrant "), Some(VectorBackend::Qdrant));
        assert_eq!(VectorBackend::parse("faiss"), None);
    }

    #[test]
    fn test_default_config_uses_provider_top_k() {
        let config = AppConfig::default();
        assert_eq!(config.top_k, DEFAULT_TOP_K);
        assert_eq!(config.vector_backend, VectorBackend::Pinecone);
    }
}
