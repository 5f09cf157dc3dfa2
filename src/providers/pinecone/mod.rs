pub mod pinecone;

pub use pinecone::PineconeStore;
