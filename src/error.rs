use crate::tree::NodeId;

/// Failure of a single layout request. Nothing is retried; the caller fixes
/// the inputs and asks for a fresh layout.
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("malformed tree: {message}")]
    MalformedTree { message: String },

    #[error("tree has no nodes")]
    EmptyTree,

    #[error("layer {layer} is missing attribute `{key}`")]
    MissingAttribute { layer: usize, key: String },

    #[error("no node labelled `{label}`")]
    UnknownNode { label: String },

    #[error("node {node} is not part of the tree")]
    NodeOutOfRange { node: NodeId },
}

impl LayoutError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedTree {
            message: message.into(),
        }
    }

    pub(crate) fn missing(layer: usize, key: &str) -> Self {
        Self::MissingAttribute {
            layer,
            key: key.to_owned(),
        }
    }
}

pub type Result<T, E = LayoutError> = std::result::Result<T, E>;
