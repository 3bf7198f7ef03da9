use std::{
    any::{Any, TypeId},
    fmt::Debug,
    mem::size_of,
    rc::Rc,
};

/// Errors reported by user constructors and injected methods
pub type DynError = Box<dyn std::error::Error>;

/// Type Name and Type Id
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct TypeInfo {
    pub type_name: &'static str,
    pub type_id: TypeId,
    is_abstract: bool,
}
impl std::fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name)
    }
}
impl TypeInfo {
    pub fn of<T: 'static + ?Sized>() -> TypeInfo {
        TypeInfo {
            type_name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
            // References to unsized types are fat - trait objects can never be built directly
            is_abstract: size_of::<&T>() != size_of::<&()>(),
        }
    }

    /// True for trait objects (and other unsized types), which can only be used as contracts
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }
}

/// Type erased handle to a resolved `Rc<T>`
///
/// Cloning an instance clones the handle, never the value.
#[derive(Clone)]
pub struct Instance {
    pub info: TypeInfo,
    value: Rc<dyn Any>,
}
impl Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Instance").field(&self.info.type_name).finish()
    }
}

impl Instance {
    pub fn new<T: 'static + ?Sized>(value: Rc<T>) -> Self {
        Instance {
            info: TypeInfo::of::<T>(),
            value: Rc::new(value),
        }
    }

    pub fn downcast<T: 'static + ?Sized>(&self) -> Result<Rc<T>, &'static str> {
        match self.value.downcast_ref::<Rc<T>>() {
            Some(downcasted) => Ok(downcasted.clone()),
            None => Err(self.info.type_name),
        }
    }

    /// Whether both handles point at the same instance
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Rc::ptr_eq(&self.value, &other.value)
    }
}

/// The "is-a `Contract`" capability
///
/// Every type implements itself. Use [`implements!`](crate::implements) to declare
/// that a type can stand in for a trait object contract.
pub trait Implements<Contract: ?Sized + 'static>: 'static {
    fn upcast(self: Rc<Self>) -> Rc<Contract>;
}
impl<T: ?Sized + 'static> Implements<T> for T {
    fn upcast(self: Rc<Self>) -> Rc<T> {
        self
    }
}
