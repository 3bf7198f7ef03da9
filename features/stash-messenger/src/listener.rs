use std::rc::Rc;

use crate::{
    message::{Message, MessageType},
    messenger::Messenger,
};

/// Receives messages of type `M`
///
/// A listener may implement this for any number of message types.
pub trait Receiver<M: Message>: 'static {
    fn receive(&self, message: &M);
}

/// Interest of a listener `L` in one message type
pub struct Subscription<L> {
    message: MessageType,
    attach: fn(&Messenger, &Rc<L>),
}
impl<L> Clone for Subscription<L> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<L> Copy for Subscription<L> {}
impl<L> std::fmt::Debug for Subscription<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Subscription")
            .field(&self.message.type_name)
            .finish()
    }
}
impl<L: 'static> Subscription<L> {
    pub fn of<M: Message>() -> Self
    where
        L: Receiver<M>,
    {
        Subscription {
            message: MessageType::of::<M>(),
            attach: attach::<M, L>,
        }
    }

    pub fn message(&self) -> MessageType {
        self.message
    }

    pub(crate) fn attach(&self, messenger: &Messenger, listener: &Rc<L>) {
        (self.attach)(messenger, listener);
    }
}

fn attach<M: Message, L: Receiver<M>>(messenger: &Messenger, listener: &Rc<L>) {
    messenger.register::<M, L>(listener);
}

/// A listener which lists every message type it handles
///
/// Usually implemented with [`listener!`](crate::listener).
pub trait Listener: Sized + 'static {
    fn subscriptions() -> Vec<Subscription<Self>>;
}

/// Implements [`Listener`] from the message types a type receives
///
/// `listener!(InventoryTracker: ItemAdded, ItemRemoved);`
#[macro_export]
macro_rules! listener {
    ($listener:ty : $($message:ty),+ $(,)?) => {
        impl $crate::Listener for $listener {
            fn subscriptions() -> ::std::vec::Vec<$crate::Subscription<Self>> {
                ::std::vec![$($crate::Subscription::of::<$message>()),+]
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::message::{Message, MessageType};

    use super::{Listener, Receiver};

    #[derive(Default)]
    struct ChestClosed;
    impl Message for ChestClosed {}

    struct Latch;
    impl Receiver<ChestClosed> for Latch {
        fn receive(&self, _: &ChestClosed) {}
    }
    listener!(Latch: ChestClosed);

    #[test]
    fn macro_lists_declared_messages() {
        let subscriptions = Latch::subscriptions();

        assert_eq!(subscriptions.len(), 1);
        assert_eq!(subscriptions[0].message(), MessageType::of::<ChestClosed>());
        assert!(format!("{:?}", subscriptions[0]).contains("ChestClosed"));
    }
}
