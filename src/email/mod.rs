pub mod decode;
pub mod normalizer;
pub mod payload;

// Re-export commonly used items
pub use normalizer::{normalize, AttachmentInfo, HeaderField, NormalizedEmail};
pub use payload::{Header, MimePart, PartBody, RawMessage};
