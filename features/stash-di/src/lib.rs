//! Binding registry with constructor and method injection.
//!
//! The registry consists of three parts:
//! 1. Contracts and implementations - usually `dyn Trait` contracts, implemented by
//!    concrete types which declare their constructors through [`Injectable`]
//! 2. Bindings - a contract mapped to an implementation, a lifecycle and optional literal
//!    constructor arguments, configured through the [`Binder`] returned by `bind*`
//! 3. Resolution - [`Dependencies::resolve`] builds object graphs by resolving the
//!    parameters of the selected constructor recursively
//!
//! ```
//! use std::rc::Rc;
//! use stash_di::{contract, implements, Constructors, Dependencies, Injectable, Param};
//!
//! trait Storage {
//!     fn name(&self) -> &str;
//! }
//! contract!(dyn Storage);
//!
//! #[derive(Default)]
//! struct ChestStorage;
//! impl Storage for ChestStorage {
//!     fn name(&self) -> &str {
//!         "chest"
//!     }
//! }
//! impl Injectable for ChestStorage {
//!     fn constructors() -> Constructors<Self> {
//!         Constructors::defaulted()
//!     }
//! }
//! implements!(ChestStorage: dyn Storage);
//!
//! struct Sorter {
//!     storage: Rc<dyn Storage>,
//! }
//! impl Injectable for Sorter {
//!     fn constructors() -> Constructors<Self> {
//!         Constructors::new().public([Param::of::<dyn Storage>()], |args| {
//!             Ok(Sorter { storage: args.next()? })
//!         })
//!     }
//! }
//!
//! let deps = Dependencies::new();
//! deps.bind::<dyn Storage, ChestStorage>().as_singleton().unwrap();
//!
//! let sorter = deps.resolve::<Sorter>().unwrap();
//! assert_eq!(sorter.storage.name(), "chest");
//! ```

pub mod binding;
pub mod constructors;
pub mod container;
pub mod dependency_graph;
pub mod errors;
pub mod methods;
pub mod types;

pub use binding::{Binder, Lifecycle};
pub use constructors::{Arguments, Constructors, Injectable, Literals, Param, Visibility};
pub use container::Dependencies;
pub use dependency_graph::{DependencyGraph, DependencyGraphError, DependencyGraphErrors};
pub use errors::{DiError, ErrorKind};
pub use methods::{Method, MethodKind, MethodTable, Methods, Returned};
pub use types::{DynError, Implements, Instance, TypeInfo};

/// Declares trait object contracts, which can be resolved but never constructed
///
/// `contract!(dyn Storage, dyn Sorter);`
#[macro_export]
macro_rules! contract {
    ($($contract:ty),+ $(,)?) => {
        $(
            impl $crate::Injectable for $contract {
                fn constructors() -> $crate::Constructors<Self> {
                    $crate::Constructors::abstract_type()
                }
            }
        )+
    };
}

/// Declares that a type can be bound to one or more contracts
///
/// `implements!(ChestStorage: dyn Storage, dyn Named);`
///
/// Also works between trait objects, given the contract is a supertrait.
#[macro_export]
macro_rules! implements {
    ($implementation:ty : $($contract:ty),+ $(,)?) => {
        $(
            impl $crate::Implements<$contract> for $implementation {
                fn upcast(self: ::std::rc::Rc<Self>) -> ::std::rc::Rc<$contract> {
                    self
                }
            }
        )+
    };
}

/// Builds [`Literals`] from a list of values
///
/// `literals!["chest".to_string(), 27_u32]`
#[macro_export]
macro_rules! literals {
    ($($value:expr),* $(,)?) => {
        $crate::Literals::new()$(.with($value))*
    };
}
