use std::{
    cell::{Cell, RefCell},
    marker::PhantomData,
    rc::Rc,
};

use crate::{
    constructors::{ErasedConstructors, Literals},
    errors::DiError,
    types::{Instance, TypeInfo},
};

/// How a binding produces instances
///
/// Chosen at most once per binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    /// Not chosen yet - behaves like [`Lifecycle::Transient`]
    #[default]
    Unset,
    /// A new instance per resolve
    Transient,
    /// One instance, built on first resolve
    Singleton,
    /// A fixed value supplied at bind time
    Constant,
}

/// One registry entry, mapping a contract to its implementation
pub(crate) struct Binding {
    pub(crate) contract: TypeInfo,
    pub(crate) implementation: TypeInfo,
    pub(crate) constructors: ErasedConstructors,
    pub(crate) literals: Literals,
    lifecycle: Cell<Lifecycle>,
    /// Replaced by a later binding or disposed
    detached: Cell<bool>,
    /// Outer `None` = nothing cached, inner `None` = empty constant
    cached: RefCell<Option<Option<Instance>>>,
}
impl Binding {
    pub(crate) fn new(
        contract: TypeInfo,
        constructors: ErasedConstructors,
        literals: Literals,
    ) -> Self {
        Binding {
            contract,
            implementation: constructors.target,
            constructors,
            literals,
            lifecycle: Cell::new(Lifecycle::Unset),
            detached: Cell::new(false),
            cached: RefCell::new(None),
        }
    }

    pub(crate) fn lifecycle(&self) -> Lifecycle {
        self.lifecycle.get()
    }

    pub(crate) fn cached(&self) -> Option<Option<Instance>> {
        self.cached.borrow().clone()
    }

    pub(crate) fn cache(&self, instance: Instance) {
        *self.cached.borrow_mut() = Some(Some(instance));
    }

    fn clear_cache(&self) {
        self.cached.borrow_mut().take();
    }

    /// Called once the registry no longer holds this binding
    pub(crate) fn detach(&self) {
        self.detached.set(true);
        self.clear_cache();
    }

    fn select(&self, lifecycle: Lifecycle) -> Result<(), DiError> {
        if self.detached.get() {
            return Err(DiError::BindingDetached(self.contract));
        }

        let current = self.lifecycle.get();
        if current != Lifecycle::Unset {
            return Err(DiError::LifecycleAlreadySet {
                contract: self.contract,
                current,
            });
        }

        tracing::debug!("'{}' configured as {lifecycle:?}", self.contract);
        self.lifecycle.set(lifecycle);
        Ok(())
    }
}

/// Configures the lifecycle of a freshly registered binding
///
/// Returned by the `bind*` methods of [`Dependencies`](crate::Dependencies).
/// The configuration methods are write-once: after one of them succeeded,
/// every further call fails with [`DiError::LifecycleAlreadySet`]. Once the contract
/// is bound again, or the registry is disposed, they fail with [`DiError::BindingDetached`].
pub struct Binder<Contract: ?Sized> {
    binding: Rc<Binding>,
    _contract: PhantomData<fn() -> Rc<Contract>>,
}
impl<Contract: ?Sized> std::fmt::Debug for Binder<Contract> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binder")
            .field("contract", &self.binding.contract.type_name)
            .field("implementation", &self.binding.implementation.type_name)
            .field("lifecycle", &self.binding.lifecycle())
            .finish()
    }
}
impl<Contract: ?Sized + 'static> Binder<Contract> {
    pub(crate) fn new(binding: Rc<Binding>) -> Self {
        Binder {
            binding,
            _contract: PhantomData,
        }
    }

    /// Build once, then hand out the same instance
    pub fn as_singleton(&self) -> Result<&Self, DiError> {
        self.binding.select(Lifecycle::Singleton)?;
        Ok(self)
    }

    /// Build a new instance on every resolve
    pub fn as_transient(&self) -> Result<&Self, DiError> {
        self.binding.select(Lifecycle::Transient)?;
        Ok(self)
    }

    /// Always resolve to `value` - `None` resolves to an empty constant
    pub fn to_constant(&self, value: Option<Rc<Contract>>) -> Result<&Self, DiError> {
        self.to_constant_instance(value.map(Instance::new))
    }

    /// Type erased [`Binder::to_constant`]
    ///
    /// The instance must hold exactly a `Contract`: an implementation of a trait object
    /// contract is only accepted once upcast, as in `Instance::new(Rc::new(chest) as Rc<dyn Storage>)`.
    /// Anything else fails right away with [`DiError::ConstantNotAssignable`].
    pub fn to_constant_instance(&self, value: Option<Instance>) -> Result<&Self, DiError> {
        if let Some(instance) = &value {
            if instance.info.type_id != self.binding.contract.type_id {
                return Err(DiError::ConstantNotAssignable {
                    contract: self.binding.contract,
                    actual: instance.info,
                });
            }
        }

        self.binding.select(Lifecycle::Constant)?;
        *self.binding.cached.borrow_mut() = Some(value);
        Ok(self)
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.binding.lifecycle()
    }

    pub fn contract(&self) -> TypeInfo {
        self.binding.contract
    }

    pub fn implementation(&self) -> TypeInfo {
        self.binding.implementation
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use crate::{
        constructors::{ErasedConstructors, Literals},
        errors::{DiError, ErrorKind},
        types::{Instance, TypeInfo},
    };

    use super::{Binder, Binding, Lifecycle};

    fn binder() -> Binder<String> {
        let info = TypeInfo::of::<String>();
        Binder::new(Rc::new(Binding::new(
            info,
            ErasedConstructors::none(info),
            Literals::new(),
        )))
    }

    #[test]
    fn new_bindings_are_unset() {
        let binder = binder();
        assert_eq!(binder.lifecycle(), Lifecycle::Unset);
        assert_eq!(binder.contract(), binder.implementation());
    }

    #[test]
    fn constant_is_cached_at_bind_time() {
        let binder = binder();
        binder
            .to_constant(Some(Rc::new("value".to_string())))
            .unwrap();

        let cached = binder.binding.cached().flatten().unwrap();
        assert_eq!(*cached.downcast::<String>().unwrap(), "value");
        assert_eq!(binder.lifecycle(), Lifecycle::Constant);
    }

    #[test]
    fn foreign_constant_is_rejected_before_lifecycle_is_set() {
        let binder = binder();
        let err = binder
            .to_constant_instance(Some(Instance::new(Rc::new(5_u32))))
            .unwrap_err();

        assert!(matches!(err, DiError::ConstantNotAssignable { .. }));
        assert_eq!(err.kind(), ErrorKind::ConfigurationConflict);
        assert_eq!(binder.lifecycle(), Lifecycle::Unset);
    }
}
