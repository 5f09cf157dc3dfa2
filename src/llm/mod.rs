pub mod answer;
pub mod index_builder;
pub mod retriever;

pub use answer::answer_query;
pub use index_builder::build_index;
pub use retriever::{Retriever, VectorStoreRetriever};
