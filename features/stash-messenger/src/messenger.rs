use std::{
    any::{type_name, Any, TypeId},
    cell::RefCell,
    collections::HashMap,
    fmt::Debug,
    rc::{Rc, Weak},
};

use crate::{
    errors::MessengerError,
    listener::{Listener, Receiver},
    message::{Message, MessageType, Request},
};

type Deliver<M> = Rc<dyn Fn(&M) -> bool>;

/// A registered listener for messages of type `M`
struct Handler<M> {
    listener: Weak<dyn Any>,
    /// Returns false once the listener is gone
    deliver: Deliver<M>,
}
impl<M> Clone for Handler<M> {
    fn clone(&self) -> Self {
        Handler {
            listener: self.listener.clone(),
            deliver: self.deliver.clone(),
        }
    }
}
impl<M> Handler<M> {
    fn is(&self, listener: usize) -> bool {
        address(self.listener.as_ptr()) == listener
    }

    fn is_alive(&self) -> bool {
        self.listener.strong_count() > 0
    }
}

/// Handlers of one message type, in registration order
struct Bucket<M> {
    message: MessageType,
    handlers: Vec<Handler<M>>,
}

/// Type erased access to a [`Bucket`]
trait AnyBucket {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn message(&self) -> MessageType;
    fn contains(&self, listener: usize) -> bool;
    fn remove(&mut self, listener: usize) -> bool;
    fn prune(&mut self);
    fn live(&self) -> usize;
    fn is_empty(&self) -> bool;
}
impl<M: Message> AnyBucket for Bucket<M> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn message(&self) -> MessageType {
        self.message
    }

    fn contains(&self, listener: usize) -> bool {
        self.handlers.iter().any(|handler| handler.is(listener))
    }

    fn remove(&mut self, listener: usize) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|handler| !handler.is(listener));
        before != self.handlers.len()
    }

    fn prune(&mut self) {
        self.handlers.retain(Handler::is_alive);
    }

    fn live(&self) -> usize {
        self.handlers.iter().filter(|handler| handler.is_alive()).count()
    }

    fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

fn address<T: ?Sized>(pointer: *const T) -> usize {
    pointer as *const () as usize
}

/// Synchronous, type keyed message bus
///
/// Listeners are held weakly: registering does not keep a listener alive, and dropped
/// listeners are skipped and forgotten on the next delivery. Messages are delivered
/// in registration order, on the caller's stack.
///
/// ```
/// use std::{cell::Cell, rc::Rc};
/// use stash_messenger::{listener, Message, Messenger, Receiver};
///
/// #[derive(Default)]
/// struct ItemStored;
/// impl Message for ItemStored {}
///
/// #[derive(Default)]
/// struct Counter(Cell<u32>);
/// impl Receiver<ItemStored> for Counter {
///     fn receive(&self, _: &ItemStored) {
///         self.0.set(self.0.get() + 1);
///     }
/// }
/// listener!(Counter: ItemStored);
///
/// let messenger = Messenger::new();
/// let counter = Rc::new(Counter::default());
/// messenger.register_all(&counter);
///
/// messenger.send::<ItemStored>();
/// assert_eq!(counter.0.get(), 1);
/// ```
#[derive(Default)]
pub struct Messenger {
    buckets: RefCell<HashMap<TypeId, Box<dyn AnyBucket>>>,
}
impl Debug for Messenger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let buckets = self.buckets.borrow();
        let mut map = f.debug_map();
        for bucket in buckets.values() {
            map.entry(&bucket.message().type_name, &bucket.live());
        }
        map.finish()
    }
}

impl Messenger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes `listener` to messages of type `M`
    ///
    /// Registering the same listener twice for a message type has no effect.
    pub fn register<M: Message, L: Receiver<M>>(&self, listener: &Rc<L>) {
        let weak: Weak<L> = Rc::downgrade(listener);
        let id = address(Rc::as_ptr(listener));

        let mut buckets = self.buckets.borrow_mut();
        let bucket = buckets.entry(TypeId::of::<M>()).or_insert_with(|| {
            Box::new(Bucket::<M> {
                message: MessageType::of::<M>(),
                handlers: Vec::new(),
            })
        });
        let Some(bucket) = bucket.as_any_mut().downcast_mut::<Bucket<M>>() else {
            tracing::error!("Bucket for '{}' has the wrong type", type_name::<M>());
            return;
        };

        if bucket.contains(id) {
            tracing::debug!(
                "'{}' is already registered for '{}'",
                type_name::<L>(),
                type_name::<M>()
            );
            return;
        }

        let receiver = weak.clone();
        bucket.handlers.push(Handler {
            listener: weak,
            deliver: Rc::new(move |message: &M| match receiver.upgrade() {
                Some(listener) => {
                    listener.receive(message);
                    true
                }
                None => false,
            }),
        });

        tracing::debug!(
            "Registered '{}' for '{}'",
            type_name::<L>(),
            type_name::<M>()
        );
    }

    /// Subscribes `listener` to every message type it lists
    pub fn register_all<L: Listener>(&self, listener: &Rc<L>) {
        for subscription in L::subscriptions() {
            subscription.attach(self, listener);
        }
    }

    /// Subscribes `listener` to a list of message types only known at runtime
    ///
    /// Every entry must be one of the messages `L` lists in [`Listener::subscriptions`].
    /// Fails without registering anything otherwise.
    pub fn register_types<L: Listener>(
        &self,
        listener: &Rc<L>,
        messages: &[MessageType],
    ) -> Result<(), MessengerError> {
        let known = L::subscriptions();
        let selected = messages
            .iter()
            .map(|message| {
                known
                    .iter()
                    .find(|subscription| subscription.message().type_id == message.type_id)
                    .ok_or(MessengerError::NotAMessage(message.type_name))
            })
            .collect::<Result<Vec<_>, _>>()?;

        for subscription in selected {
            subscription.attach(self, listener);
        }
        Ok(())
    }

    /// Unsubscribes `listener` from messages of type `M`
    pub fn unregister<M: Message, L: 'static>(&self, listener: &Rc<L>) {
        let id = address(Rc::as_ptr(listener));
        let mut buckets = self.buckets.borrow_mut();

        let Some(bucket) = buckets.get_mut(&TypeId::of::<M>()) else {
            return;
        };
        if bucket.remove(id) {
            tracing::debug!(
                "Unregistered '{}' from '{}'",
                type_name::<L>(),
                type_name::<M>()
            );
        }
        if bucket.is_empty() {
            buckets.remove(&TypeId::of::<M>());
        }
    }

    /// Unsubscribes `listener` from every message type
    pub fn unregister_all<L: 'static>(&self, listener: &Rc<L>) {
        let id = address(Rc::as_ptr(listener));
        let mut buckets = self.buckets.borrow_mut();

        let mut removed = 0;
        buckets.retain(|_, bucket| {
            if bucket.remove(id) {
                removed += 1;
            }
            !bucket.is_empty()
        });

        tracing::debug!(
            "Unregistered '{}' from {removed} message types",
            type_name::<L>()
        );
    }

    /// Sends a default constructed `M`
    pub fn send<M: Message + Default>(&self) {
        self.send_message(&M::default());
    }

    /// Delivers `message` to every listener registered for `M`
    pub fn send_message<M: Message>(&self, message: &M) {
        self.deliver(message, || false);
    }

    /// Sends a default constructed request and returns its answer
    pub fn request<M: Request + Default>(&self) -> Result<M::Output, MessengerError> {
        self.request_message(M::default())
    }

    /// Delivers `message` and returns its answer, or the default if nobody answered
    ///
    /// Fails if more than one listener answered. Delivery stops at the second answer.
    pub fn request_message<M: Request>(&self, message: M) -> Result<M::Output, MessengerError> {
        self.deliver(&message, || message.slot().is_conflicted());

        if message.slot().is_conflicted() {
            tracing::error!("'{}' was answered more than once", type_name::<M>());
            return Err(MessengerError::ResultAlreadySet {
                result: type_name::<M::Output>(),
            });
        }

        Ok(message.slot().take())
    }

    fn deliver<M: Message>(&self, message: &M, stop: impl Fn() -> bool) {
        // Listeners may register, unregister or send while being called
        let handlers = match self.buckets.borrow().get(&TypeId::of::<M>()) {
            Some(bucket) => match bucket.as_any().downcast_ref::<Bucket<M>>() {
                Some(bucket) => bucket.handlers.clone(),
                None => {
                    tracing::error!("Bucket for '{}' has the wrong type", type_name::<M>());
                    return;
                }
            },
            None => {
                tracing::trace!("No listeners for '{}'", type_name::<M>());
                return;
            }
        };

        tracing::trace!(
            "Sending '{}' to {} listeners",
            type_name::<M>(),
            handlers.len()
        );

        let mut dropped = false;
        for handler in &handlers {
            if !(handler.deliver)(message) {
                dropped = true;
            }
            if stop() {
                break;
            }
        }

        if dropped {
            self.prune::<M>();
        }
    }

    /// Forgets dropped listeners of `M`
    fn prune<M: Message>(&self) {
        let mut buckets = self.buckets.borrow_mut();
        let Some(bucket) = buckets.get_mut(&TypeId::of::<M>()) else {
            return;
        };

        bucket.prune();
        tracing::trace!("Pruned dropped listeners of '{}'", type_name::<M>());
        if bucket.is_empty() {
            buckets.remove(&TypeId::of::<M>());
        }
    }

    /// Number of live listeners for `M`
    pub fn listener_count<M: Message>(&self) -> usize {
        self.buckets
            .borrow()
            .get(&TypeId::of::<M>())
            .map_or(0, |bucket| bucket.live())
    }

    pub fn is_registered<M: Message, L: 'static>(&self, listener: &Rc<L>) -> bool {
        let id = address(Rc::as_ptr(listener));
        self.buckets
            .borrow()
            .get(&TypeId::of::<M>())
            .is_some_and(|bucket| bucket.contains(id))
    }

    /// Forgets every listener
    pub fn clear(&self) {
        self.buckets.borrow_mut().clear();
    }
}
