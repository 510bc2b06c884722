//! Error types for graph mutation, reading and writing.

use crate::graph::ElementId;

/// Errors returned by [`Graph`](crate::Graph), [`Document`](crate::Document),
/// the reader and the writer.
///
/// Every failure is reported at the operation boundary. A failed read or
/// write never leaves a partially built result behind.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A link endpoint is not a live element of the graph being mutated.
    #[error("Invalid link {owner} -> {target}: {reason}")]
    InvalidLink {
        owner: ElementId,
        target: ElementId,
        reason: &'static str,
    },

    /// Structurally invalid input (bad index, missing field, truncated data).
    #[error("Malformed document: {entity} {index}: {message}")]
    MalformedDocument {
        /// Wire-format entity type, e.g. `"accessor"` or `"bufferView"`.
        entity: &'static str,
        /// Index of the offending entry within its array.
        index: usize,
        message: String,
    },

    /// Image bytes match no known signature and no MIME type was set.
    #[error("Unknown image format for texture {index}{}", name_suffix(.name))]
    UnknownImageFormat { index: usize, name: Option<String> },

    /// The requested output layout cannot represent the document.
    #[error("Unsupported packing option: {0}")]
    UnsupportedPackingOption(String),

    /// The byte resolver failed to provide an external resource.
    #[error("Failed to resolve '{uri}': {source}")]
    Resolve {
        uri: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn name_suffix(name: &Option<String>) -> String {
    match name {
        Some(name) => format!(" ('{name}')"),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Shorthand for [`Error::MalformedDocument`].
pub(crate) fn malformed(entity: &'static str, index: usize, message: impl Into<String>) -> Error {
    Error::MalformedDocument {
        entity,
        index,
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_message_names_entity_and_index() {
        let err = malformed("accessor", 3, "bufferView 9 out of range");
        assert_eq!(
            err.to_string(),
            "Malformed document: accessor 3: bufferView 9 out of range"
        );
    }

    #[test]
    fn test_unknown_image_format_message() {
        let unnamed = Error::UnknownImageFormat {
            index: 2,
            name: None,
        };
        assert_eq!(unnamed.to_string(), "Unknown image format for texture 2");

        let named = Error::UnknownImageFormat {
            index: 0,
            name: Some("albedo".into()),
        };
        assert_eq!(
            named.to_string(),
            "Unknown image format for texture 0 ('albedo')"
        );
    }
}
