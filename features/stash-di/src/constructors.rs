use std::{any::type_name, rc::Rc};

use crate::{
    errors::DiError,
    types::{DynError, Implements, Instance, TypeInfo},
};

/// A type the registry knows how to build
///
/// Instead of inspecting constructors at runtime, every injectable type lists them explicitly.
/// Trait object contracts declare themselves abstract with [`contract!`](crate::contract).
///
/// ```
/// use std::rc::Rc;
/// use stash_di::{Constructors, Injectable, Param};
///
/// #[derive(Default)]
/// struct Clock;
/// impl Injectable for Clock {
///     fn constructors() -> Constructors<Self> {
///         Constructors::defaulted()
///     }
/// }
///
/// struct Scheduler {
///     clock: Rc<Clock>,
/// }
/// impl Injectable for Scheduler {
///     fn constructors() -> Constructors<Self> {
///         Constructors::new().public([Param::of::<Clock>()], |args| {
///             Ok(Scheduler { clock: args.next()? })
///         })
///     }
/// }
/// ```
pub trait Injectable: 'static {
    /// Constructors in order of preference
    fn constructors() -> Constructors<Self>;
}

/// Whether a constructor may be used for injection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

type Build<T> = Rc<dyn Fn(&mut Arguments) -> Result<Rc<T>, DynError>>;

pub struct Constructor<T: ?Sized> {
    visibility: Visibility,
    params: Vec<Param>,
    build: Build<T>,
}

/// The construction strategy of a type
pub struct Constructors<T: ?Sized> {
    list: Vec<Constructor<T>>,
    default: Option<Rc<dyn Fn() -> Rc<T>>>,
    is_abstract: bool,
}
impl<T: ?Sized + 'static> Constructors<T> {
    /// A type without any constructors
    pub fn new() -> Self {
        Constructors {
            list: Vec::new(),
            default: None,
            is_abstract: false,
        }
    }

    /// A contract which can never be constructed itself
    pub fn abstract_type() -> Self {
        Constructors {
            is_abstract: true,
            ..Self::new()
        }
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty() && self.default.is_none()
    }

    /// Type erases the constructors, upcasting whatever they build to `Contract`
    pub(crate) fn erase_as<Contract: ?Sized + 'static>(self) -> ErasedConstructors
    where
        T: Implements<Contract>,
    {
        let list = self
            .list
            .into_iter()
            .map(|constructor| {
                let build = constructor.build;
                ErasedConstructor {
                    visibility: constructor.visibility,
                    params: constructor.params.into(),
                    build: Rc::new(move |args: &mut Arguments| {
                        let built = build(args)?;
                        Ok(Instance::new(Implements::<Contract>::upcast(built)))
                    }),
                }
            })
            .collect();

        let default = self.default.map(|default| {
            Rc::new(move || Instance::new(Implements::<Contract>::upcast(default())))
                as Rc<dyn Fn() -> Instance>
        });

        ErasedConstructors {
            target: TypeInfo::of::<T>(),
            list,
            default,
            is_abstract: self.is_abstract,
        }
    }
}
impl<T: ?Sized + 'static> Default for Constructors<T> {
    fn default() -> Self {
        Self::new()
    }
}
impl<T: 'static> Constructors<T> {
    /// A type without declared constructors which is built from its [`Default`]
    pub fn defaulted() -> Self
    where
        T: Default,
    {
        Constructors {
            default: Some(Rc::new(|| Rc::new(T::default()))),
            ..Self::new()
        }
    }

    /// Adds a constructor the registry may use
    pub fn public<F>(self, params: impl IntoIterator<Item = Param>, build: F) -> Self
    where
        F: Fn(&mut Arguments) -> Result<T, DynError> + 'static,
    {
        self.with(Visibility::Public, params, build)
    }

    /// Adds a constructor the registry must not use
    pub fn private<F>(self, params: impl IntoIterator<Item = Param>, build: F) -> Self
    where
        F: Fn(&mut Arguments) -> Result<T, DynError> + 'static,
    {
        self.with(Visibility::Private, params, build)
    }

    fn with<F>(mut self, visibility: Visibility, params: impl IntoIterator<Item = Param>, build: F) -> Self
    where
        F: Fn(&mut Arguments) -> Result<T, DynError> + 'static,
    {
        self.list.push(Constructor {
            visibility,
            params: params.into_iter().collect(),
            build: Rc::new(move |args: &mut Arguments| build(args).map(Rc::new)),
        });
        self
    }
}

/// A declared constructor or method parameter
#[derive(Clone, Copy)]
pub struct Param {
    pub info: TypeInfo,
    /// Constructor table for types the registry may build without a binding
    pub(crate) constructors: Option<fn() -> ErasedConstructors>,
}
impl std::fmt::Debug for Param {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Param")
            .field("type", &self.info.type_name)
            .field("constructible", &self.constructors.is_some())
            .finish()
    }
}
impl Param {
    /// A dependency which is resolved from its binding, or built implicitly if unbound
    pub fn of<T: Injectable + ?Sized>() -> Param {
        Param {
            info: TypeInfo::of::<T>(),
            constructors: Some(erased_constructors::<T>),
        }
    }

    /// A value which is only available through a binding or a bind-time literal
    pub fn value<T: ?Sized + 'static>() -> Param {
        Param::unconstructible(TypeInfo::of::<T>())
    }

    pub(crate) fn unconstructible(info: TypeInfo) -> Param {
        Param {
            info,
            constructors: None,
        }
    }
}

fn erased_constructors<T: Injectable + ?Sized>() -> ErasedConstructors {
    T::constructors().erase_as::<T>()
}

/// Resolved arguments, handed to a constructor in declaration order
pub struct Arguments {
    target: TypeInfo,
    values: std::vec::IntoIter<Option<Instance>>,
}
impl Arguments {
    pub(crate) fn new(target: TypeInfo, values: Vec<Option<Instance>>) -> Self {
        Arguments {
            target,
            values: values.into_iter(),
        }
    }

    /// Takes the next argument
    pub fn next<T: ?Sized + 'static>(&mut self) -> Result<Rc<T>, DiError> {
        self.next_optional::<T>()?
            .ok_or(DiError::EmptyConstant(TypeInfo::of::<T>()))
    }

    /// Takes the next argument, which may be bound to an empty constant
    pub fn next_optional<T: ?Sized + 'static>(&mut self) -> Result<Option<Rc<T>>, DiError> {
        let value = self.values.next().ok_or(DiError::MissingArgument {
            target: self.target,
            wanted: type_name::<T>(),
        })?;

        value
            .map(|instance| {
                instance
                    .downcast::<T>()
                    .map_err(|actual| DiError::ArgumentMismatch {
                        target: self.target,
                        wanted: type_name::<T>(),
                        actual,
                    })
            })
            .transpose()
    }

    /// Takes the next argument by value
    pub fn next_value<T: Clone + 'static>(&mut self) -> Result<T, DiError> {
        self.next::<T>().map(|value| T::clone(&value))
    }

    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

/// Literal constructor arguments supplied at bind time
///
/// They are matched by exact type and order against a constructor's parameters,
/// but only if no constructor can be satisfied from the registry alone.
#[derive(Clone, Default)]
pub struct Literals {
    values: Vec<Instance>,
}
impl std::fmt::Debug for Literals {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.values.iter().map(|value| value.info.type_name))
            .finish()
    }
}
impl Literals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T: 'static>(mut self, value: T) -> Self {
        self.values.push(Instance::new(Rc::new(value)));
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether the parameter list has exactly the literal types, in order
    pub(crate) fn matches(&self, params: &[Param]) -> bool {
        params.len() == self.values.len()
            && params
                .iter()
                .zip(&self.values)
                .all(|(param, value)| param.info.type_id == value.info.type_id)
    }

    pub(crate) fn arguments(&self) -> Vec<Option<Instance>> {
        self.values.iter().cloned().map(Some).collect()
    }
}

pub(crate) struct ErasedConstructor {
    pub(crate) visibility: Visibility,
    pub(crate) params: Rc<[Param]>,
    pub(crate) build: Rc<dyn Fn(&mut Arguments) -> Result<Instance, DynError>>,
}

/// Constructors of an implementation, producing instances of a contract
#[derive(Clone)]
pub(crate) struct ErasedConstructors {
    pub(crate) target: TypeInfo,
    pub(crate) list: Rc<[ErasedConstructor]>,
    pub(crate) default: Option<Rc<dyn Fn() -> Instance>>,
    pub(crate) is_abstract: bool,
}
impl ErasedConstructors {
    /// Table for a contract that is only ever served from a constant
    pub(crate) fn none(target: TypeInfo) -> Self {
        ErasedConstructors {
            target,
            list: Rc::new([]),
            default: None,
            is_abstract: target.is_abstract(),
        }
    }

    pub(crate) fn public(&self) -> impl Iterator<Item = (usize, &ErasedConstructor)> {
        self.list
            .iter()
            .enumerate()
            .filter(|(_, constructor)| constructor.visibility == Visibility::Public)
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use crate::{errors::DiError, types::Instance};

    use super::{Arguments, Constructors, Literals, Param, TypeInfo};

    struct Point {
        x: i32,
        y: i32,
    }

    #[test]
    fn arguments_are_taken_in_order() {
        let target = TypeInfo::of::<Point>();
        let mut args = Arguments::new(
            target,
            vec![
                Some(Instance::new(Rc::new(3_i32))),
                Some(Instance::new(Rc::new(4_i32))),
            ],
        );

        let point = Point {
            x: args.next_value().unwrap(),
            y: args.next_value().unwrap(),
        };
        assert_eq!((point.x, point.y), (3, 4));
        assert_eq!(args.remaining(), 0);

        assert!(matches!(
            args.next::<i32>(),
            Err(DiError::MissingArgument { .. })
        ));
    }

    #[test]
    fn mismatched_argument_names_both_types() {
        let mut args = Arguments::new(
            TypeInfo::of::<Point>(),
            vec![Some(Instance::new(Rc::new("x".to_string())))],
        );

        match args.next::<i32>() {
            Err(DiError::ArgumentMismatch { wanted, actual, .. }) => {
                assert_eq!(wanted, "i32");
                assert_eq!(actual, "alloc::string::String");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_argument_is_only_accepted_as_optional() {
        let mut args = Arguments::new(TypeInfo::of::<Point>(), vec![None, None]);

        assert!(args.next_optional::<i32>().unwrap().is_none());
        assert!(matches!(args.next::<i32>(), Err(DiError::EmptyConstant(_))));
    }

    #[test]
    fn literals_match_exact_types_in_order() {
        let literals = Literals::new().with(1_i32).with("name".to_string());

        assert!(literals.matches(&[Param::value::<i32>(), Param::value::<String>()]));
        assert!(!literals.matches(&[Param::value::<String>(), Param::value::<i32>()]));
        assert!(!literals.matches(&[Param::value::<i32>()]));
    }

    #[test]
    fn erased_constructors_keep_declaration_order() {
        let constructors = Constructors::<Point>::new()
            .private([], |_| Ok(Point { x: 0, y: 0 }))
            .public([Param::value::<i32>(), Param::value::<i32>()], |args| {
                Ok(Point {
                    x: args.next_value()?,
                    y: args.next_value()?,
                })
            })
            .erase_as::<Point>();

        let public: Vec<usize> = constructors.public().map(|(index, _)| index).collect();
        assert_eq!(public, vec![1]);
        assert_eq!(constructors.target, TypeInfo::of::<Point>());
        assert!(!constructors.is_abstract);
    }
}
