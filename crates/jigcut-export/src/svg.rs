//! SVG export serializer.
//!
//! Writes the cut outline as an SVG document built with the [`svg`]
//! crate: one `<path>` for the horizontal curves, one for the vertical
//! curves and one for the border. Each shared edge appears exactly once,
//! so the file is suitable for a laser or plotter.
//!
//! Optional [`SvgMetadata`] embeds `<title>`, `<desc>` and a `<metadata>`
//! block carrying the puzzle configuration JSON.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use svg::Document;
use svg::node::element::{Description, Element, Path, Title};
use svg::node::{Node, Text};

use jigcut_core::PathDescription;

/// Namespace of the `<jigcut:puzzle>` metadata element.
pub const METADATA_NAMESPACE: &str = "https://jigcut.dev/ns/1";

/// Metadata to embed in the SVG document. Every field is optional.
///
/// Text values are XML-escaped by the `svg` crate.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Emitted as `<title>`, typically the source image file stem.
    pub title: Option<&'a str>,

    /// Emitted as `<desc>`.
    pub description: Option<&'a str>,

    /// Serialized puzzle configuration, wrapped in `<metadata>` so the
    /// file carries the seed and grid needed to regenerate it.
    pub config_json: Option<&'a str>,
}

/// Serialize the cut outline of `path` into an SVG document.
///
/// The `viewBox` and size match the outline's pixel dimensions. Empty
/// parts (no horizontal curves for a single row, for example) are
/// skipped.
#[must_use]
pub fn to_svg(path: &PathDescription, metadata: &SvgMetadata<'_>) -> String {
    let (w, h) = (path.width(), path.height());
    let mut doc = Document::new()
        .set("width", w)
        .set("height", h)
        .set("viewBox", (0.0, 0.0, w, h));

    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }

    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }

    if let Some(config_json) = metadata.config_json {
        let mut puzzle_el = Element::new("jigcut:puzzle");
        puzzle_el.assign("xmlns:jigcut", METADATA_NAMESPACE);
        puzzle_el.append(Text::new(config_json));
        let mut metadata_el = Element::new("metadata");
        metadata_el.append(puzzle_el);
        doc = doc.add(metadata_el);
    }

    let parts = [
        ("horizontal", path.horizontal_path_data()),
        ("vertical", path.vertical_path_data()),
        ("border", path.border_path_data()),
    ];
    for (id, d) in parts {
        if d.is_empty() {
            continue;
        }
        let element = Path::new()
            .set("id", id)
            .set("d", d)
            .set("fill", "none")
            .set("stroke", "black")
            .set("stroke-width", 1);
        doc = doc.add(element);
    }

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}
