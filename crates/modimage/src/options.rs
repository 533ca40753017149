use serde::{Deserialize, Serialize};

use crate::{header::ImageByteOrder, pool::DuplicatePolicy};

/// Per-build settings shared by the pool, index builder and writer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageOptions {
    pub byte_order: ImageByteOrder,
    pub duplicate_policy: DuplicatePolicy,
    /// Store identical content only once.
    pub deduplicate_content: bool,
}

impl ImageOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_byte_order(mut self, byte_order: ImageByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    pub fn with_duplicate_policy(mut self, duplicate_policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = duplicate_policy;
        self
    }

    pub fn with_deduplicate_content(mut self, deduplicate_content: bool) -> Self {
        self.deduplicate_content = deduplicate_content;
        self
    }
}
