pub mod cohere;

pub use cohere::CohereEmbeddings;
