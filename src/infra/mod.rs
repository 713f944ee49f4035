//! Infrastructure: error taxonomy shared by every layer.

pub mod error;
