use std::{
    any::TypeId,
    cell::RefCell,
    collections::{HashMap, HashSet},
    fmt::Debug,
    rc::Rc,
};

use crate::{
    binding::{Binder, Binding, Lifecycle},
    constructors::{Arguments, ErasedConstructor, ErasedConstructors, Injectable, Literals, Param},
    errors::DiError,
    types::{Implements, Instance, TypeInfo},
};

/// Binding registry
///
/// Maps contracts to implementations and builds object graphs by resolving constructor
/// parameters recursively. Meant to live in the composition root and to be handed to
/// whoever needs it; there is no global instance.
///
/// All operations take `&self` - the registry is single threaded, a constructor may
/// use the registry it is being resolved from.
#[derive(Default)]
pub struct Dependencies {
    bindings: RefCell<HashMap<TypeId, Rc<Binding>>>,
    /// Implementations currently under construction, outermost first
    resolving: RefCell<Vec<TypeInfo>>,
}
impl Debug for Dependencies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bindings = self.bindings.borrow();
        let mut map = f.debug_map();
        for binding in bindings.values() {
            map.entry(
                &binding.contract.type_name,
                &format_args!(
                    "{} ({:?})",
                    binding.implementation.type_name,
                    binding.lifecycle()
                ),
            );
        }
        map.finish()
    }
}

/// Constructor picked for an implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Selected {
    /// Built from its `Default`
    Default,
    /// Every parameter comes from the registry
    Resolved(usize),
    /// Parameters are the bind-time literals
    Literals(usize),
}

impl Dependencies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `Implementation` for `Contract`, replacing any previous binding
    ///
    /// Binders of a replaced binding can no longer configure it.
    pub fn bind<Contract, Implementation>(&self) -> Binder<Contract>
    where
        Contract: ?Sized + 'static,
        Implementation: Injectable + Implements<Contract> + ?Sized,
    {
        self.bind_with::<Contract, Implementation>(Literals::new())
    }

    /// Like [`Dependencies::bind`], with literal constructor arguments
    pub fn bind_with<Contract, Implementation>(&self, literals: Literals) -> Binder<Contract>
    where
        Contract: ?Sized + 'static,
        Implementation: Injectable + Implements<Contract> + ?Sized,
    {
        let constructors = Implementation::constructors().erase_as::<Contract>();
        self.insert(Binding::new(
            TypeInfo::of::<Contract>(),
            constructors,
            literals,
        ))
    }

    /// Registers `Implementation` as its own contract
    pub fn bind_self<Implementation: Injectable + ?Sized>(&self) -> Binder<Implementation> {
        self.bind::<Implementation, Implementation>()
    }

    pub fn bind_self_with<Implementation: Injectable + ?Sized>(
        &self,
        literals: Literals,
    ) -> Binder<Implementation> {
        self.bind_with::<Implementation, Implementation>(literals)
    }

    /// Binds `Contract` to an existing instance
    pub fn bind_instance<Contract: ?Sized + 'static>(
        &self,
        instance: Rc<Contract>,
    ) -> Result<Binder<Contract>, DiError> {
        let info = TypeInfo::of::<Contract>();
        let binder = self.insert::<Contract>(Binding::new(
            info,
            ErasedConstructors::none(info),
            Literals::new(),
        ));
        binder.to_constant(Some(instance))?;
        Ok(binder)
    }

    fn insert<Contract: ?Sized + 'static>(&self, binding: Binding) -> Binder<Contract> {
        let binding = Rc::new(binding);
        let replaced = self
            .bindings
            .borrow_mut()
            .insert(binding.contract.type_id, binding.clone());

        match replaced {
            Some(previous) => {
                tracing::warn!(
                    "Binding for '{}' replaced: '{}' -> '{}'",
                    binding.contract,
                    previous.implementation,
                    binding.implementation
                );
                previous.detach();
            }
            None => tracing::debug!(
                "Bound '{}' to '{}'",
                binding.contract,
                binding.implementation
            ),
        }

        Binder::new(binding)
    }

    pub fn is_bound<Contract: ?Sized + 'static>(&self) -> bool {
        self.bindings
            .borrow()
            .contains_key(&TypeId::of::<Contract>())
    }

    pub fn len(&self) -> usize {
        self.bindings.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.borrow().is_empty()
    }

    /// Returns an instance satisfying `Contract`
    ///
    /// Unbound types are constructed implicitly. Fails with [`DiError::EmptyConstant`]
    /// if the contract is bound to an empty constant, see [`Dependencies::resolve_optional`].
    pub fn resolve<Contract: Injectable + ?Sized>(&self) -> Result<Rc<Contract>, DiError> {
        self.resolve_optional::<Contract>()?
            .ok_or(DiError::EmptyConstant(TypeInfo::of::<Contract>()))
    }

    /// Like [`Dependencies::resolve`], but an empty constant resolves to `None`
    pub fn resolve_optional<Contract: Injectable + ?Sized>(
        &self,
    ) -> Result<Option<Rc<Contract>>, DiError> {
        let info = TypeInfo::of::<Contract>();
        self.resolve_param(&Param::of::<Contract>())?
            .map(|instance| {
                instance
                    .downcast::<Contract>()
                    .map_err(|actual| DiError::ArgumentMismatch {
                        target: info,
                        wanted: info.type_name,
                        actual,
                    })
            })
            .transpose()
    }

    /// Resolves a contract only known by its descriptor
    ///
    /// Without a static type there is no constructor table for unbound types,
    /// so only bound contracts can be resolved here.
    pub fn resolve_type(&self, contract: Option<TypeInfo>) -> Result<Option<Instance>, DiError> {
        let contract = contract.ok_or(DiError::NullType)?;
        self.resolve_param(&Param::unconstructible(contract))
    }

    pub(crate) fn binding(&self, type_id: &TypeId) -> Option<Rc<Binding>> {
        self.bindings.borrow().get(type_id).cloned()
    }

    pub(crate) fn bindings(&self) -> Vec<Rc<Binding>> {
        self.bindings.borrow().values().cloned().collect()
    }

    pub(crate) fn resolve_param(&self, param: &Param) -> Result<Option<Instance>, DiError> {
        tracing::trace!("Resolving '{}'", param.info);

        match self.binding(&param.info.type_id) {
            Some(binding) => self.create(&binding),
            None => match param.constructors {
                Some(constructors) => self
                    .construct(&constructors(), &Literals::new())
                    .map(Some),
                None => Err(DiError::Unresolvable(param.info)),
            },
        }
    }

    fn create(&self, binding: &Binding) -> Result<Option<Instance>, DiError> {
        if let Some(cached) = binding.cached() {
            return Ok(cached);
        }

        let instance = self.construct(&binding.constructors, &binding.literals)?;

        if binding.lifecycle() == Lifecycle::Singleton {
            tracing::debug!("Caching singleton '{}'", binding.contract);
            binding.cache(instance.clone());
        }

        Ok(Some(instance))
    }

    fn construct(
        &self,
        constructors: &ErasedConstructors,
        literals: &Literals,
    ) -> Result<Instance, DiError> {
        let target = constructors.target;
        if constructors.is_abstract {
            return Err(DiError::InterfaceTarget(target));
        }

        let _guard = ResolvingGuard::enter(&self.resolving, target)?;

        let (build, values) = match self.select(constructors, literals)? {
            Selected::Default => {
                return match &constructors.default {
                    Some(default) => Ok(default()),
                    None => Err(DiError::NoPublicConstructor(target)),
                }
            }
            Selected::Resolved(index) => {
                let constructor = &constructors.list[index];
                let values = constructor
                    .params
                    .iter()
                    .map(|param| self.resolve_param(param))
                    .collect::<Result<Vec<_>, _>>()?;
                (constructor.build.clone(), values)
            }
            Selected::Literals(index) => (constructors.list[index].build.clone(), literals.arguments()),
        };

        let mut args = Arguments::new(target, values);
        build(&mut args).map_err(|error| {
            let error = DiError::from_construction(target, error);
            tracing::error!("Constructing '{target}' failed: {error}");
            error
        })
    }

    /// Picks the constructor used to build `constructors.target`, without building anything
    pub(crate) fn select(
        &self,
        constructors: &ErasedConstructors,
        literals: &Literals,
    ) -> Result<Selected, DiError> {
        let target = constructors.target;
        let public: Vec<(usize, &ErasedConstructor)> = constructors.public().collect();

        if public.is_empty() {
            // Only hidden constructors - nothing to build with
            if !constructors.list.is_empty() || constructors.default.is_none() {
                return Err(DiError::NoPublicConstructor(target));
            }
            return Ok(Selected::Default);
        }

        let mut visiting = HashSet::from([target.type_id]);
        let resolvable = public.iter().find(|(_, constructor)| {
            constructor
                .params
                .iter()
                .all(|param| self.can_resolve(param, &mut visiting))
        });
        if let Some((index, _)) = resolvable {
            return Ok(Selected::Resolved(*index));
        }

        if !literals.is_empty() {
            if let Some((index, _)) = public
                .iter()
                .find(|(_, constructor)| literals.matches(&constructor.params))
            {
                return Ok(Selected::Literals(*index));
            }
        }

        let (_, first) = public[0];
        let unresolved = first
            .params
            .iter()
            .find(|param| !self.can_resolve(param, &mut visiting))
            .map(|param| param.info);

        Err(DiError::NoMatchingConstructor { target, unresolved })
    }

    /// Whether `param` is bound, or can be built from resolvable parameters
    ///
    /// Types already being checked count as resolvable, so cycles surface
    /// as [`DiError::CircularDependency`] when they are actually built.
    pub(crate) fn can_resolve(&self, param: &Param, visiting: &mut HashSet<TypeId>) -> bool {
        if self.bindings.borrow().contains_key(&param.info.type_id) {
            return true;
        }

        let Some(constructors) = param.constructors else {
            return false;
        };

        if !visiting.insert(param.info.type_id) {
            return true;
        }

        let constructors = constructors();
        let resolvable = !constructors.is_abstract && self.constructible(&constructors, visiting);

        visiting.remove(&param.info.type_id);
        resolvable
    }

    fn constructible(&self, constructors: &ErasedConstructors, visiting: &mut HashSet<TypeId>) -> bool {
        let mut public = constructors.public().peekable();
        if public.peek().is_none() {
            return constructors.list.is_empty() && constructors.default.is_some();
        }

        public.any(|(_, constructor)| {
            constructor
                .params
                .iter()
                .all(|param| self.can_resolve(param, visiting))
        })
    }

    /// Drops all bindings and cached instances
    ///
    /// Cached instances are released, no hooks run on them.
    pub fn dispose(&self) {
        let bindings: Vec<_> = self.bindings.borrow_mut().drain().map(|(_, binding)| binding).collect();
        tracing::debug!("Disposing {} bindings", bindings.len());

        // Binders handed out earlier may still hold a binding, release its instance regardless
        for binding in bindings {
            binding.detach();
        }
    }

    /// Alias of [`Dependencies::dispose`]
    pub fn clear(&self) {
        self.dispose();
    }
}

/// Marks an implementation as under construction for as long as the guard lives
struct ResolvingGuard<'a> {
    resolving: &'a RefCell<Vec<TypeInfo>>,
}
impl<'a> ResolvingGuard<'a> {
    fn enter(resolving: &'a RefCell<Vec<TypeInfo>>, target: TypeInfo) -> Result<Self, DiError> {
        let mut chain = resolving.borrow_mut();
        if let Some(start) = chain.iter().position(|info| *info == target) {
            let mut cycle = chain[start..].to_vec();
            cycle.push(target);
            return Err(DiError::CircularDependency { chain: cycle });
        }

        chain.push(target);
        Ok(ResolvingGuard { resolving })
    }
}
impl Drop for ResolvingGuard<'_> {
    fn drop(&mut self) {
        self.resolving.borrow_mut().pop();
    }
}
