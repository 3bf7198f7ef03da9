use std::{
    any::{type_name, Any, TypeId},
    collections::HashSet,
    rc::Rc,
};

use crate::{
    constructors::{Arguments, Param, Visibility},
    container::Dependencies,
    errors::DiError,
    types::{DynError, TypeInfo},
};

/// Value returned from an injected method, `None` for methods returning `()`
pub type Returned = Option<Box<dyn Any>>;

type Invoke<S> = Rc<dyn Fn(Option<&S>, &mut Arguments) -> Result<Returned, DynError>>;

/// Whether a method needs an instance to be called on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Instance,
    Static,
}

pub struct Method<S> {
    pub name: &'static str,
    pub visibility: Visibility,
    pub kind: MethodKind,
    params: Vec<Param>,
    invoke: Invoke<S>,
}

/// Methods of a type which can be called by name with injected parameters
///
/// ```
/// use std::rc::Rc;
/// use stash_di::{Dependencies, MethodTable, Methods, Param};
///
/// struct Greeting(String);
///
/// struct Handler;
/// impl Methods for Handler {
///     fn methods() -> MethodTable<Self> {
///         MethodTable::new().public("greet", [Param::value::<Greeting>()], |_, args| {
///             let greeting: Rc<Greeting> = args.next()?;
///             Ok(greeting.0.clone())
///         })
///     }
/// }
///
/// let deps = Dependencies::new();
/// deps.bind_instance(Rc::new(Greeting("hello".to_string()))).unwrap();
///
/// let greeting = deps.call_as::<_, String>(Some(&Handler), "greet").unwrap();
/// assert_eq!(greeting.as_deref(), Some("hello"));
/// ```
pub trait Methods: Sized + 'static {
    fn methods() -> MethodTable<Self>;
}

pub struct MethodTable<S> {
    methods: Vec<Method<S>>,
}
impl<S: 'static> Default for MethodTable<S> {
    fn default() -> Self {
        Self::new()
    }
}
impl<S: 'static> MethodTable<S> {
    pub fn new() -> Self {
        MethodTable {
            methods: Vec::new(),
        }
    }

    /// A public instance method
    pub fn public<R, F>(self, name: &'static str, params: impl IntoIterator<Item = Param>, method: F) -> Self
    where
        R: 'static,
        F: Fn(&S, &mut Arguments) -> Result<R, DynError> + 'static,
    {
        self.instance(name, Visibility::Public, params, method)
    }

    /// An instance method which must not be called from outside
    pub fn private<R, F>(self, name: &'static str, params: impl IntoIterator<Item = Param>, method: F) -> Self
    where
        R: 'static,
        F: Fn(&S, &mut Arguments) -> Result<R, DynError> + 'static,
    {
        self.instance(name, Visibility::Private, params, method)
    }

    /// A method without receiver
    pub fn associated<R, F>(mut self, name: &'static str, params: impl IntoIterator<Item = Param>, method: F) -> Self
    where
        R: 'static,
        F: Fn(&mut Arguments) -> Result<R, DynError> + 'static,
    {
        self.methods.push(Method {
            name,
            visibility: Visibility::Public,
            kind: MethodKind::Static,
            params: params.into_iter().collect(),
            invoke: Rc::new(move |_: Option<&S>, args: &mut Arguments| method(args).map(returned)),
        });
        self
    }

    fn instance<R, F>(
        mut self,
        name: &'static str,
        visibility: Visibility,
        params: impl IntoIterator<Item = Param>,
        method: F,
    ) -> Self
    where
        R: 'static,
        F: Fn(&S, &mut Arguments) -> Result<R, DynError> + 'static,
    {
        self.methods.push(Method {
            name,
            visibility,
            kind: MethodKind::Instance,
            params: params.into_iter().collect(),
            invoke: Rc::new(move |source: Option<&S>, args: &mut Arguments| match source {
                Some(source) => method(source, args).map(returned),
                None => Err(DynError::from(DiError::NullSource)),
            }),
        });
        self
    }

    pub fn get(&self, name: &str) -> Option<&Method<S>> {
        self.methods.iter().find(|method| method.name == name)
    }
}

fn returned<R: 'static>(value: R) -> Returned {
    if TypeId::of::<R>() == TypeId::of::<()>() {
        return None;
    }
    Some(Box::new(value))
}

impl Dependencies {
    /// Calls the public instance method `name` on `source`, resolving its parameters
    ///
    /// Returns what the method returned, `None` for methods returning `()`.
    pub fn call<S: Methods>(&self, source: Option<&S>, name: &str) -> Result<Returned, DiError> {
        let source = source.ok_or(DiError::NullSource)?;
        if name.is_empty() {
            return Err(DiError::EmptyMethodName);
        }

        let target = TypeInfo::of::<S>();
        let table = S::methods();
        let method = table.get(name).ok_or_else(|| DiError::MethodNotFound {
            target,
            method: name.to_string(),
        })?;

        if method.visibility != Visibility::Public || method.kind != MethodKind::Instance {
            return Err(DiError::MethodInaccessible {
                target,
                method: name.to_string(),
            });
        }

        let qualified = format!("{}::{}", target.type_name, name);
        let mut values = Vec::with_capacity(method.params.len());
        for param in &method.params {
            if !self.can_resolve(param, &mut HashSet::new()) {
                return Err(DiError::UnresolvableMethodParameter {
                    method: qualified,
                    parameter: param.info,
                });
            }
            values.push(self.resolve_param(param)?);
        }

        tracing::trace!("Calling '{qualified}' with {} injected parameters", values.len());

        let mut args = Arguments::new(target, values);
        (method.invoke)(Some(source), &mut args).map_err(|error| {
            let error = DiError::from_construction(target, error);
            tracing::error!("Calling '{qualified}' failed: {error}");
            error
        })
    }

    /// Like [`Dependencies::call`], downcasting the returned value to `R`
    pub fn call_as<S: Methods, R: 'static>(
        &self,
        source: Option<&S>,
        name: &str,
    ) -> Result<Option<R>, DiError> {
        self.call(source, name)?
            .map(|value| {
                value
                    .downcast::<R>()
                    .map(|value| *value)
                    .map_err(|_| DiError::ReturnTypeMismatch {
                        method: name.to_string(),
                        wanted: type_name::<R>(),
                    })
            })
            .transpose()
    }
}
