//! Artifact persistence
//!
//! Trained models and fitted preprocessors are written as framed bincode
//! files: magic bytes, format version, artifact kind, CRC32 of the payload.

mod serializer;

pub use serializer::{load_object, save_object, Artifact, ObjectStore};
