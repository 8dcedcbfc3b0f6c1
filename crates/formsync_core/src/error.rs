//! Error types for the reducer.

use thiserror::Error;

/// Result type for reducer operations.
pub type CoreResult<T> = Result<T, ClientError>;

/// A local invariant violation raised while applying an action.
///
/// Client errors never abort a batch: the offending action is skipped and
/// the error is reported on the `error` channel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The action targets an item that is not in the snapshot.
    #[error("item not found: {id}")]
    ItemNotFound {
        /// The missing item ID.
        id: String,
    },

    /// The action answers an item whose kind takes no answer.
    #[error("item not answerable: {id} is a {kind}")]
    NotAnswerable {
        /// The item ID.
        id: String,
        /// The item's kind.
        kind: String,
    },

    /// The action tag is not one the reducer knows.
    #[error("unexpected action type: {kind}")]
    UnexpectedAction {
        /// The action tag.
        kind: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ClientError::NotAnswerable {
            id: "q1".into(),
            kind: "group".into(),
        };
        assert_eq!(err.to_string(), "item not answerable: q1 is a group");

        let err = ClientError::ItemNotFound { id: "a9".into() };
        assert!(err.to_string().contains("a9"));
    }
}
