mod ingest;
pub mod splitter;

pub use ingest::ingest_document;
pub use splitter::RecursiveCharacterSplitter;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

/// Identity token handed out once per upload action.
///
/// Two uploads of byte-identical files get different identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone)]
pub struct UploadedDocument {
    id: DocumentId,
    file_name: String,
    bytes: Vec<u8>,
}

impl UploadedDocument {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            id: DocumentId::new(),
            file_name: file_name.into(),
            bytes,
        }
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for UploadedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedDocument")
            .field("id", &self.id)
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Only the name is serialized; validation errors carry it as a parameter.
impl Serialize for UploadedDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("UploadedDocument", 1)?;
        state.serialize_field("file_name", &self.file_name)?;
        state.end()
    }
}

/// Upload slots only take `.pdf` files; this is a name filter, the content
/// is never inspected.
pub fn is_pdf_file_name(file_name: &str) -> bool {
    file_name.to_lowercase().ends_with(".pdf")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub source: String,
    pub page: u32,
}

/// A piece of page text produced by the loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageUnit {
    pub text: String,
    pub metadata: PageMetadata,
}

impl PageUnit {
    pub fn new(text: impl Into<String>, source: impl Into<String>, page: u32) -> Self {
        Self {
            text: text.into(),
            metadata: PageMetadata {
                source: source.into(),
                page,
            },
        }
    }
}
