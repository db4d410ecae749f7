//! jigcut-export: Pure format serializers (sans-IO)
//!
//! Turns a cut puzzle into files a front end or a plotter can use: the
//! outline as SVG and a JSON manifest of the pieces.

pub mod manifest;
pub mod svg;

pub use manifest::{Manifest, PieceEntry, piece_file_name, to_manifest_json};
pub use crate::svg::{METADATA_NAMESPACE, SvgMetadata, to_svg};

/// Errors from the serializers.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// JSON serialization failed.
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}
