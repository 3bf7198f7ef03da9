//! Registry and message bus wired together in a composition root

use std::{cell::RefCell, rc::Rc};

use pretty_assertions::assert_eq;
use stash_di::{contract, implements, Constructors, Dependencies, Injectable, Param};
use stash_messenger::{listener, Message, Messenger, Receiver, Request, ResultSlot};

#[derive(Default)]
struct ItemStored {
    item: &'static str,
}
impl Message for ItemStored {}

#[derive(Default)]
struct StoredCount {
    result: ResultSlot<usize>,
}
impl Message for StoredCount {}
impl Request for StoredCount {
    type Output = usize;

    fn slot(&self) -> &ResultSlot<usize> {
        &self.result
    }
}

trait Ledger {
    fn record(&self, item: &'static str);
    fn items(&self) -> Vec<&'static str>;
}
contract!(dyn Ledger);

#[derive(Default)]
struct MemoryLedger {
    items: RefCell<Vec<&'static str>>,
}
impl Ledger for MemoryLedger {
    fn record(&self, item: &'static str) {
        self.items.borrow_mut().push(item);
    }

    fn items(&self) -> Vec<&'static str> {
        self.items.borrow().clone()
    }
}
impl Injectable for MemoryLedger {
    fn constructors() -> Constructors<Self> {
        Constructors::defaulted()
    }
}
implements!(MemoryLedger: dyn Ledger);

/// Records stored items and answers how many there are
struct Bookkeeper {
    ledger: Rc<dyn Ledger>,
}
impl Injectable for Bookkeeper {
    fn constructors() -> Constructors<Self> {
        Constructors::new().public([Param::of::<dyn Ledger>()], |args| {
            Ok(Bookkeeper {
                ledger: args.next()?,
            })
        })
    }
}
impl Receiver<ItemStored> for Bookkeeper {
    fn receive(&self, message: &ItemStored) {
        self.ledger.record(message.item);
    }
}
impl Receiver<StoredCount> for Bookkeeper {
    fn receive(&self, message: &StoredCount) {
        let _ = message.slot().set(self.ledger.items().len());
    }
}
listener!(Bookkeeper: ItemStored, StoredCount);

/// Publishes through the bus it was constructed with
struct Chest {
    messenger: Rc<Messenger>,
}
impl Injectable for Chest {
    fn constructors() -> Constructors<Self> {
        Constructors::new().public([Param::value::<Messenger>()], |args| {
            Ok(Chest {
                messenger: args.next()?,
            })
        })
    }
}
impl Chest {
    fn store(&self, item: &'static str) {
        self.messenger.send_message(&ItemStored { item });
    }
}

#[test]
fn bus_and_registry_share_the_composition_root() {
    let deps = Dependencies::new();
    let messenger = Rc::new(Messenger::new());
    deps.bind_instance(messenger.clone()).unwrap();
    deps.bind::<dyn Ledger, MemoryLedger>()
        .as_singleton()
        .unwrap();
    deps.bind_self::<Bookkeeper>().as_singleton().unwrap();

    let bookkeeper = deps.resolve::<Bookkeeper>().unwrap();
    messenger.register_all(&bookkeeper);

    let chest = deps.resolve::<Chest>().unwrap();
    chest.store("torch");
    chest.store("rope");

    assert_eq!(messenger.request::<StoredCount>(), Ok(2));
    assert_eq!(
        deps.resolve::<dyn Ledger>().unwrap().items(),
        vec!["torch", "rope"]
    );
}

#[test]
fn disposing_the_registry_silences_its_listeners() {
    let deps = Dependencies::new();
    let messenger = Rc::new(Messenger::new());
    deps.bind::<dyn Ledger, MemoryLedger>()
        .as_singleton()
        .unwrap();
    deps.bind_self::<Bookkeeper>().as_singleton().unwrap();

    messenger.register_all(&deps.resolve::<Bookkeeper>().unwrap());
    assert_eq!(messenger.listener_count::<ItemStored>(), 1);

    // The registry held the only strong reference
    deps.dispose();

    assert_eq!(messenger.listener_count::<ItemStored>(), 0);
    assert_eq!(messenger.request::<StoredCount>(), Ok(0));
}
