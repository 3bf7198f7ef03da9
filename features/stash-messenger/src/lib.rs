//! Synchronous publish/subscribe bus keyed by message type.
//!
//! Listeners implement [`Receiver<M>`] for every message type they handle, and subscribe
//! one type at a time with [`Messenger::register`], or all at once with
//! [`Messenger::register_all`] if they list their types through [`Listener`].
//!
//! A [`Request`] is a message carrying a write-once [`ResultSlot`], answered by at most
//! one listener.

pub mod errors;
pub mod listener;
pub mod message;
pub mod messenger;

pub use errors::MessengerError;
pub use listener::{Listener, Receiver, Subscription};
pub use message::{Message, MessageType, Request, ResultSlot};
pub use messenger::Messenger;
