use serde::{Deserialize, Serialize};

/// A single variant as handed to the clustering tool
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sequence {
    pub id: String,
    pub sequence: Vec<u8>,
}

impl Sequence {
    pub fn new(id: String, sequence: Vec<u8>) -> Self {
        Self { id, sequence }
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn header(&self) -> String {
        format!(">{}", self.id)
    }
}

impl From<(&str, &str)> for Sequence {
    fn from((id, sequence): (&str, &str)) -> Self {
        Sequence::new(id.to_string(), sequence.as_bytes().to_vec())
    }
}
