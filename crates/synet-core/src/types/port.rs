//! Ports and connection policies.
//!
//! A port belongs to a model, has a direction and a data type. Data types are
//! referenced by registry name; whether two names denote the same type is
//! decided by the catalog's type-alias table.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Direction of a port, seen from its owning component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortDirection {
    /// The component reads from this port.
    Input,
    /// The component writes to this port.
    Output,
}

impl PortDirection {
    /// The opposite direction.
    pub fn opposite(self) -> Self {
        match self {
            PortDirection::Input => PortDirection::Output,
            PortDirection::Output => PortDirection::Input,
        }
    }
}

/// A typed port on a component or service model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    /// Port name, unique per model and direction.
    pub name: String,
    /// Direction of the port.
    pub direction: PortDirection,
    /// Registry name of the transported data type.
    pub data_type: String,
}

impl Port {
    /// Creates an input port.
    pub fn input(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Port {
            name: name.into(),
            direction: PortDirection::Input,
            data_type: data_type.into(),
        }
    }

    /// Creates an output port.
    pub fn output(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Port {
            name: name.into(),
            direction: PortDirection::Output,
            data_type: data_type.into(),
        }
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = match self.direction {
            PortDirection::Input => "in",
            PortDirection::Output => "out",
        };
        write!(f, "{}:{}[{}]", dir, self.name, self.data_type)
    }
}

/// Buffering policy attached to a single port-to-port connection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ConnectionPolicy {
    /// Keep only the most recent sample.
    #[default]
    Data,
    /// Bounded FIFO, writer blocks when full.
    Buffer {
        /// Number of samples the buffer holds.
        size: usize,
    },
    /// Bounded ring, oldest sample overwritten when full.
    Circular {
        /// Number of samples the ring holds.
        size: usize,
    },
}

impl fmt::Display for ConnectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionPolicy::Data => write!(f, "data"),
            ConnectionPolicy::Buffer { size } => write!(f, "buffer[{size}]"),
            ConnectionPolicy::Circular { size } => write!(f, "circular[{size}]"),
        }
    }
}
