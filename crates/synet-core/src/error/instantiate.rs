//! Network instantiation errors.

use thiserror::Error;

use crate::error::ResolutionError;

/// Errors raised while expanding compositions into task graphs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InstantiationError {
    /// Autoconnect found more than one output candidate for an input port.
    #[error(
        "autoconnect in composition '{composition}' is ambiguous for {child}.{port}: \
         candidates {}",
        .candidates.join(", ")
    )]
    AmbiguousAutoConnection {
        /// Composition being instantiated.
        composition: String,
        /// Child owning the unconnected input.
        child: String,
        /// The input port name.
        port: String,
        /// Rendered `child.port` candidates.
        candidates: Vec<String>,
    },

    /// An explicitly declared child connection cannot be mapped to a unique
    /// port on the selected child.
    #[error(
        "connection in composition '{composition}' is ambiguous: \
         port '{port}' of child '{child}' maps to several concrete ports"
    )]
    AmbiguousChildConnection {
        /// Composition being instantiated.
        composition: String,
        /// Child the connection refers to.
        child: String,
        /// The declared port name.
        port: String,
    },

    /// A declared connection references a port the selected child does not
    /// have.
    #[error(
        "composition '{composition}': child '{child}' has no {direction} port named '{port}'"
    )]
    MissingPort {
        /// Composition being instantiated.
        composition: String,
        /// Child the connection refers to.
        child: String,
        /// Declared port name.
        port: String,
        /// Expected direction, as text.
        direction: &'static str,
    },

    /// A declared connection joins ports of different data types.
    #[error(
        "composition '{composition}': cannot connect {from}.{from_port} ({from_type}) \
         to {to}.{to_port} ({to_type})"
    )]
    PortTypeMismatch {
        /// Composition being instantiated.
        composition: String,
        /// Source child.
        from: String,
        /// Source port.
        from_port: String,
        /// Source data type.
        from_type: String,
        /// Sink child.
        to: String,
        /// Sink port.
        to_port: String,
        /// Sink data type.
        to_type: String,
    },

    /// A composition references a child that does not exist.
    #[error("composition '{composition}' has no child named '{child}'")]
    UnknownChild {
        /// Composition being instantiated.
        composition: String,
        /// The missing child name.
        child: String,
    },

    /// Selection resolution failed while picking a child.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
}
