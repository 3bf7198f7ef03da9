use std::{
    any::{type_name, TypeId},
    cell::{Cell, RefCell},
    fmt::Debug,
};

use crate::errors::MessengerError;

/// Marker for types which can be sent through the [`Messenger`](crate::Messenger)
pub trait Message: 'static {}

/// A message expecting a single answer
///
/// ```
/// use stash_messenger::{Message, Request, ResultSlot};
///
/// #[derive(Default)]
/// struct FreeSlots {
///     result: ResultSlot<u32>,
/// }
/// impl Message for FreeSlots {}
/// impl Request for FreeSlots {
///     type Output = u32;
///
///     fn slot(&self) -> &ResultSlot<u32> {
///         &self.result
///     }
/// }
/// ```
pub trait Request: Message {
    type Output: Default + 'static;

    fn slot(&self) -> &ResultSlot<Self::Output>;
}

/// Write-once result of a [`Request`]
pub struct ResultSlot<T> {
    value: RefCell<Option<T>>,
    conflicted: Cell<bool>,
}
impl<T> Default for ResultSlot<T> {
    fn default() -> Self {
        ResultSlot {
            value: RefCell::new(None),
            conflicted: Cell::new(false),
        }
    }
}
impl<T: Debug> Debug for ResultSlot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultSlot")
            .field("value", &self.value.borrow())
            .field("conflicted", &self.conflicted.get())
            .finish()
    }
}
impl<T> ResultSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers the request
    ///
    /// Only the first call succeeds. Later calls fail, and the request they answer fails too.
    pub fn set(&self, value: T) -> Result<(), MessengerError> {
        let mut slot = self.value.borrow_mut();
        if slot.is_some() {
            self.conflicted.set(true);
            return Err(MessengerError::ResultAlreadySet {
                result: type_name::<T>(),
            });
        }

        *slot = Some(value);
        Ok(())
    }

    pub fn is_set(&self) -> bool {
        self.value.borrow().is_some()
    }

    /// Whether a second answer was attempted
    pub fn is_conflicted(&self) -> bool {
        self.conflicted.get()
    }

    /// Takes the answer, or the default if nobody answered
    pub fn take(&self) -> T
    where
        T: Default,
    {
        self.value.borrow_mut().take().unwrap_or_default()
    }
}

/// Name and id of a message type
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct MessageType {
    pub type_name: &'static str,
    pub type_id: TypeId,
}
impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name)
    }
}
impl MessageType {
    pub fn of<T: 'static + ?Sized>() -> MessageType {
        MessageType {
            type_name: type_name::<T>(),
            type_id: TypeId::of::<T>(),
        }
    }
}
