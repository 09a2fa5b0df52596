// ============================================================
// Layer 3 - Domain Layer
// ============================================================
// Plain Rust structs and traits: no burn types, no file I/O.

// A question about an image plus its annotations
pub mod vqa_record;

// Core abstractions (traits) that other layers implement
pub mod traits;
