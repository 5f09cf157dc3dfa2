pub mod cohere;
pub mod document;
pub mod groq;
pub mod pinecone;
pub mod traits;
