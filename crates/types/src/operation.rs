//! Storage operations recorded during speculative execution.

use crate::Version;
use std::fmt;

/// A single storage operation performed by a transaction.
///
/// Operations are recorded in program (execution) order under their address
/// in a [`ModifyMap`](crate::ModifyMap). The address itself is the map key
/// and is not repeated here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Read of the address, tagged with the store version visible at the
    /// moment the read was performed.
    Load {
        /// Store version observed at read time.
        version: Version,
    },

    /// Write of `data` to the address.
    Store {
        /// Payload written.
        data: Vec<u8>,
    },

    /// Deletion of the address.
    Remove,
}

impl Operation {
    /// Whether this is a read.
    pub fn is_load(&self) -> bool {
        matches!(self, Operation::Load { .. })
    }

    /// Whether this is a write (STORE or REMOVE).
    pub fn is_write(&self) -> bool {
        !self.is_load()
    }

    /// Short name for logging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Operation::Load { .. } => "LOAD",
            Operation::Store { .. } => "STORE",
            Operation::Remove => "REMOVE",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Load { version } => write!(f, "LOAD(v{})", version),
            Operation::Store { data } => write!(f, "STORE({} bytes)", data.len()),
            Operation::Remove => write!(f, "REMOVE"),
        }
    }
}

/// The resolved final write for one address of a committed transaction.
///
/// Obtained by scanning the address's operation list from the most recent
/// operation backward and stopping at the first STORE or REMOVE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteEffect<'a> {
    /// The address ends up holding this payload.
    Store(&'a [u8]),

    /// The address ends up deleted.
    Remove,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_classification() {
        let load = Operation::Load {
            version: Version(3),
        };
        let store = Operation::Store { data: vec![1, 2] };
        let remove = Operation::Remove;

        assert!(load.is_load());
        assert!(!load.is_write());
        assert!(store.is_write());
        assert!(remove.is_write());
        assert_eq!(load.type_name(), "LOAD");
        assert_eq!(store.type_name(), "STORE");
        assert_eq!(remove.type_name(), "REMOVE");
    }

    #[test]
    fn test_operation_display() {
        let load = Operation::Load {
            version: Version(7),
        };
        assert_eq!(load.to_string(), "LOAD(v7)");
        assert_eq!(Operation::Remove.to_string(), "REMOVE");
    }
}
