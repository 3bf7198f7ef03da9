use thiserror::Error;

/// Errors of the message bus
///
/// Both are configuration conflicts: programmer errors surfaced right away.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MessengerError {
    /// Tried to subscribe to a type the listener does not receive as a [`Message`](crate::Message)
    #[error("'{0}' is not a message of this listener")]
    NotAMessage(&'static str),
    /// A second listener tried to answer a request
    #[error("Result '{result}' has already been set")]
    ResultAlreadySet { result: &'static str },
}
