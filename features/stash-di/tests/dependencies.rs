use std::{cell::Cell, fmt, rc::Rc};

use pretty_assertions::assert_eq;
use rstest::rstest;
use stash_di::{
    contract, implements, literals, Binder, Constructors, Dependencies, DependencyGraphError,
    DiError, ErrorKind, Injectable, Instance, Lifecycle, MethodTable, Methods, Param, TypeInfo,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

trait Storage {
    fn name(&self) -> &'static str;
}
trait LabeledStorage: Storage {
    fn label(&self) -> &str;
}
contract!(dyn Storage, dyn LabeledStorage);
implements!(dyn LabeledStorage: dyn Storage);

#[derive(Default)]
struct ChestStorage;
impl Storage for ChestStorage {
    fn name(&self) -> &'static str {
        "chest"
    }
}
impl Injectable for ChestStorage {
    fn constructors() -> Constructors<Self> {
        Constructors::defaulted()
    }
}
implements!(ChestStorage: dyn Storage);

#[derive(Default)]
struct BarrelStorage;
impl Storage for BarrelStorage {
    fn name(&self) -> &'static str {
        "barrel"
    }
}
impl Injectable for BarrelStorage {
    fn constructors() -> Constructors<Self> {
        Constructors::defaulted()
    }
}
implements!(BarrelStorage: dyn Storage);

/// Can only be built from inside
struct Vault;
impl Injectable for Vault {
    fn constructors() -> Constructors<Self> {
        Constructors::new().private([], |_| Ok(Vault))
    }
}

struct Inventory {
    storage: Rc<dyn Storage>,
}
impl Injectable for Inventory {
    fn constructors() -> Constructors<Self> {
        Constructors::new().public([Param::of::<dyn Storage>()], |args| {
            Ok(Inventory {
                storage: args.next()?,
            })
        })
    }
}

struct Player {
    inventory: Rc<Inventory>,
}
impl Injectable for Player {
    fn constructors() -> Constructors<Self> {
        Constructors::new().public([Param::of::<Inventory>()], |args| {
            Ok(Player {
                inventory: args.next()?,
            })
        })
    }
}

struct World {
    player: Rc<Player>,
}
impl Injectable for World {
    fn constructors() -> Constructors<Self> {
        Constructors::new().public([Param::of::<Player>()], |args| {
            Ok(World {
                player: args.next()?,
            })
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ShopName(String);

struct Shop {
    name: ShopName,
    slots: u32,
}
impl Injectable for Shop {
    fn constructors() -> Constructors<Self> {
        Constructors::new().public(
            [Param::value::<ShopName>(), Param::value::<u32>()],
            |args| {
                Ok(Shop {
                    name: args.next_value()?,
                    slots: args.next_value()?,
                })
            },
        )
    }
}

#[test]
fn resolves_bound_implementation() {
    init_tracing();
    let deps = Dependencies::new();
    deps.bind::<dyn Storage, ChestStorage>();

    assert_eq!(deps.resolve::<dyn Storage>().unwrap().name(), "chest");
}

#[test]
fn last_binding_wins() {
    init_tracing();
    let deps = Dependencies::new();
    deps.bind::<dyn Storage, ChestStorage>();
    deps.bind::<dyn Storage, BarrelStorage>();

    assert_eq!(deps.len(), 1);
    assert_eq!(deps.resolve::<dyn Storage>().unwrap().name(), "barrel");
}

#[test]
fn null_type_is_rejected() {
    let deps = Dependencies::new();
    deps.bind::<dyn Storage, ChestStorage>();

    let err = deps.resolve_type(None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ArgumentNull);
}

#[test]
fn defaulted_type_is_constructed() {
    let deps = Dependencies::new();
    deps.bind_self::<ChestStorage>();

    assert_eq!(deps.resolve::<ChestStorage>().unwrap().name(), "chest");
}

#[test]
fn private_only_constructor_fails() {
    let deps = Dependencies::new();
    deps.bind_self::<Vault>();

    let err = deps.resolve::<Vault>().err().unwrap();
    assert!(matches!(err, DiError::NoPublicConstructor(_)));
    assert_eq!(err.kind(), ErrorKind::InjectionFailure);
}

#[test]
fn singleton_is_shared() {
    let deps = Dependencies::new();
    deps.bind::<dyn Storage, ChestStorage>()
        .as_singleton()
        .unwrap();

    let first = deps.resolve::<dyn Storage>().unwrap();
    let second = deps.resolve::<dyn Storage>().unwrap();
    assert!(Rc::ptr_eq(&first, &second));
}

#[rstest]
#[case::transient(true)]
#[case::unset(false)]
fn transient_is_built_per_resolve(#[case] explicit: bool) {
    let deps = Dependencies::new();
    let binder = deps.bind_self::<Inventory>();
    if explicit {
        binder.as_transient().unwrap();
    }
    deps.bind::<dyn Storage, ChestStorage>();

    let first = deps.resolve::<Inventory>().unwrap();
    let second = deps.resolve::<Inventory>().unwrap();
    assert!(!Rc::ptr_eq(&first, &second));
}

#[derive(Debug, Clone, Copy)]
enum Configure {
    Singleton,
    Transient,
    Constant,
}
impl Configure {
    fn apply(self, binder: &Binder<dyn Storage>) -> Result<(), DiError> {
        match self {
            Configure::Singleton => binder.as_singleton().map(|_| ()),
            Configure::Transient => binder.as_transient().map(|_| ()),
            Configure::Constant => binder
                .to_constant(Some(Rc::new(ChestStorage)))
                .map(|_| ()),
        }
    }
}

#[rstest]
fn lifecycle_can_only_be_chosen_once(
    #[values(Configure::Singleton, Configure::Transient, Configure::Constant)] first: Configure,
    #[values(Configure::Singleton, Configure::Transient, Configure::Constant)] second: Configure,
) {
    let deps = Dependencies::new();
    let binder = deps.bind::<dyn Storage, ChestStorage>();

    first.apply(&binder).unwrap();
    let err = second.apply(&binder).unwrap_err();

    assert!(matches!(err, DiError::LifecycleAlreadySet { .. }));
    assert_eq!(err.kind(), ErrorKind::ConfigurationConflict);
}

#[test]
fn constant_resolves_to_the_given_instance() {
    let deps = Dependencies::new();
    let chest: Rc<dyn Storage> = Rc::new(ChestStorage);
    deps.bind::<dyn Storage, BarrelStorage>()
        .to_constant(Some(chest.clone()))
        .unwrap();

    assert!(Rc::ptr_eq(&deps.resolve::<dyn Storage>().unwrap(), &chest));
}

#[test]
fn mismatched_constant_fails_at_bind_time() {
    let deps = Dependencies::new();
    let binder = deps.bind::<dyn Storage, ChestStorage>();

    let err = binder
        .to_constant_instance(Some(Instance::new(Rc::new(ShopName(
            "Tinker".to_string(),
        )))))
        .unwrap_err();

    assert!(matches!(err, DiError::ConstantNotAssignable { .. }));
    assert_eq!(err.kind(), ErrorKind::ConfigurationConflict);
    // The failed call did not configure the binding
    assert_eq!(binder.lifecycle(), Lifecycle::Unset);
}

#[test]
fn erased_constant_must_be_upcast_to_the_contract() {
    let deps = Dependencies::new();
    let binder = deps.bind::<dyn Storage, BarrelStorage>();

    let err = binder
        .to_constant_instance(Some(Instance::new(Rc::new(ChestStorage))))
        .unwrap_err();
    match err {
        DiError::ConstantNotAssignable { contract, actual } => {
            assert_eq!(contract, TypeInfo::of::<dyn Storage>());
            assert_eq!(actual, TypeInfo::of::<ChestStorage>());
        }
        other => panic!("unexpected error {other}"),
    }

    let chest: Rc<dyn Storage> = Rc::new(ChestStorage);
    binder.to_constant_instance(Some(Instance::new(chest))).unwrap();
    assert_eq!(deps.resolve::<dyn Storage>().unwrap().name(), "chest");
}

#[test]
fn binder_of_a_replaced_binding_is_detached() {
    init_tracing();
    let deps = Dependencies::new();
    let stale = deps.bind::<dyn Storage, ChestStorage>();
    deps.bind::<dyn Storage, BarrelStorage>();

    let err = stale.as_singleton().unwrap_err();
    assert!(matches!(err, DiError::BindingDetached(_)));
    assert_eq!(err.kind(), ErrorKind::ConfigurationConflict);

    // The live binding is untouched
    let first = deps.resolve::<dyn Storage>().unwrap();
    let second = deps.resolve::<dyn Storage>().unwrap();
    assert_eq!(first.name(), "barrel");
    assert!(!Rc::ptr_eq(&first, &second));
}

#[test]
fn binder_is_detached_by_dispose() {
    let deps = Dependencies::new();
    let binder = deps.bind::<dyn Storage, ChestStorage>();

    deps.dispose();

    assert!(matches!(
        binder.to_constant(None),
        Err(DiError::BindingDetached(_))
    ));
}

#[test]
fn empty_constant_resolves_to_nothing() {
    let deps = Dependencies::new();
    deps.bind::<dyn Storage, ChestStorage>()
        .to_constant(None)
        .unwrap();

    assert!(deps.resolve_optional::<dyn Storage>().unwrap().is_none());
}

#[test]
fn interface_bound_to_itself_fails() {
    let deps = Dependencies::new();
    deps.bind::<dyn Storage, dyn Storage>();

    let err = deps.resolve::<dyn Storage>().err().unwrap();
    assert!(matches!(err, DiError::InterfaceTarget(_)));
    assert_eq!(err.kind(), ErrorKind::ConfigurationConflict);
}

#[test]
fn interface_bound_to_derived_interface_fails() {
    let deps = Dependencies::new();
    let binder = deps.bind::<dyn Storage, dyn LabeledStorage>();
    assert_eq!(binder.implementation(), TypeInfo::of::<dyn LabeledStorage>());

    let err = deps.resolve::<dyn Storage>().err().unwrap();
    assert_eq!(err.kind(), ErrorKind::ConfigurationConflict);
}

#[test]
fn nested_graph_is_resolved() {
    init_tracing();
    let deps = Dependencies::new();
    deps.bind::<dyn Storage, BarrelStorage>();

    let world = deps.resolve::<World>().unwrap();
    assert_eq!(world.player.inventory.storage.name(), "barrel");
}

#[test]
fn unresolvable_parameter_names_its_type() {
    let deps = Dependencies::new();

    let err = deps.resolve::<Inventory>().err().unwrap();
    assert_eq!(err.kind(), ErrorKind::ArgumentInvalid);
    assert!(
        err.to_string().contains(std::any::type_name::<dyn Storage>()),
        "error should name the storage contract: {err}"
    );

    // Unresolvable because of a nested dependency
    match deps.resolve::<Player>() {
        Err(DiError::NoMatchingConstructor { unresolved, .. }) => {
            assert_eq!(unresolved, Some(TypeInfo::of::<Inventory>()))
        }
        Err(other) => panic!("unexpected error {other}"),
        Ok(_) => panic!("player was constructed"),
    }
}

#[test]
fn literals_satisfy_value_parameters() {
    let deps = Dependencies::new();
    deps.bind_self_with::<Shop>(literals![ShopName("Tinker".to_string()), 12_u32]);

    let shop = deps.resolve::<Shop>().unwrap();
    assert_eq!(shop.name, ShopName("Tinker".to_string()));
    assert_eq!(shop.slots, 12);
}

#[test]
fn literals_in_the_wrong_order_do_not_match() {
    let deps = Dependencies::new();
    deps.bind_self_with::<Shop>(literals![12_u32, ShopName("Tinker".to_string())]);

    let err = deps.resolve::<Shop>().err().unwrap();
    assert!(matches!(err, DiError::NoMatchingConstructor { .. }));
}

struct Hen {
    _egg: Rc<Egg>,
}
impl Injectable for Hen {
    fn constructors() -> Constructors<Self> {
        Constructors::new().public([Param::of::<Egg>()], |args| {
            Ok(Hen { _egg: args.next()? })
        })
    }
}

struct Egg {
    _hen: Rc<Hen>,
}
impl Injectable for Egg {
    fn constructors() -> Constructors<Self> {
        Constructors::new().public([Param::of::<Hen>()], |args| {
            Ok(Egg { _hen: args.next()? })
        })
    }
}

#[test]
fn cycle_is_detected_on_resolve() {
    init_tracing();
    let deps = Dependencies::new();

    match deps.resolve::<Hen>() {
        Err(DiError::CircularDependency { chain }) => assert_eq!(
            chain,
            vec![
                TypeInfo::of::<Hen>(),
                TypeInfo::of::<Egg>(),
                TypeInfo::of::<Hen>()
            ]
        ),
        Err(other) => panic!("unexpected error {other}"),
        Ok(_) => panic!("a cycle was constructed"),
    }
}

#[test]
fn validate_reports_cycles() {
    let deps = Dependencies::new();
    deps.bind_self::<Hen>();

    let errors = deps.validate().err().unwrap();
    assert!(errors
        .errors
        .iter()
        .any(|error| matches!(error, DependencyGraphError::CircularDependency { .. })));
}

#[test]
fn validate_accepts_a_complete_configuration() {
    let deps = Dependencies::new();
    deps.bind::<dyn Storage, ChestStorage>().as_singleton().unwrap();
    deps.bind_self::<World>();

    let graph = deps.validate().unwrap();
    assert_eq!(
        graph.dependencies_of(&TypeInfo::of::<Inventory>()),
        Some([TypeInfo::of::<dyn Storage>()].as_slice())
    );
}

#[derive(Debug)]
struct Jammed;
impl fmt::Display for Jammed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("the lock is jammed")
    }
}
impl std::error::Error for Jammed {}

struct Attempts(Cell<u32>);

/// Fails on the first attempt
struct Lock;
impl Injectable for Lock {
    fn constructors() -> Constructors<Self> {
        Constructors::new().public([Param::value::<Attempts>()], |args| {
            let attempts: Rc<Attempts> = args.next()?;
            attempts.0.set(attempts.0.get() + 1);
            if attempts.0.get() == 1 {
                return Err(Jammed.into());
            }
            Ok(Lock)
        })
    }
}

#[test]
fn failed_singleton_is_not_cached() {
    init_tracing();
    let deps = Dependencies::new();
    let attempts = Rc::new(Attempts(Cell::new(0)));
    deps.bind_instance(attempts.clone()).unwrap();
    deps.bind_self::<Lock>().as_singleton().unwrap();

    let err = deps.resolve::<Lock>().err().unwrap();
    assert!(matches!(err, DiError::ConstructionFailed { .. }));
    assert_eq!(err.kind(), ErrorKind::InjectionFailure);
    assert!(err.to_string().contains("jammed"));

    let first = deps.resolve::<Lock>().unwrap();
    let second = deps.resolve::<Lock>().unwrap();
    assert!(Rc::ptr_eq(&first, &second));
    assert_eq!(attempts.0.get(), 2);
}

#[derive(Debug)]
struct Label;

struct Sorter;
impl Methods for Sorter {
    fn methods() -> MethodTable<Self> {
        MethodTable::new()
            .public("sort", [Param::of::<dyn Storage>()], |_: &Sorter, args| {
                let storage: Rc<dyn Storage> = args.next()?;
                Ok(storage.name())
            })
            .public("label", [Param::value::<Label>()], |_: &Sorter, _| Ok(()))
            .private("compact", [], |_: &Sorter, _| Ok(()))
            .associated("create", [], |_| Ok(Sorter))
    }
}

#[test]
fn call_injects_method_parameters() {
    let deps = Dependencies::new();
    deps.bind::<dyn Storage, ChestStorage>();

    assert_eq!(
        deps.call_as::<_, &'static str>(Some(&Sorter), "sort").unwrap(),
        Some("chest")
    );
}

#[rstest]
#[case::null_source(None, "sort", ErrorKind::ArgumentNull)]
#[case::empty_name(Some(Sorter), "", ErrorKind::ArgumentInvalid)]
#[case::unknown(Some(Sorter), "shuffle", ErrorKind::ArgumentInvalid)]
#[case::private(Some(Sorter), "compact", ErrorKind::ArgumentInvalid)]
#[case::associated(Some(Sorter), "create", ErrorKind::ArgumentInvalid)]
#[case::unresolvable_parameter(Some(Sorter), "label", ErrorKind::ConfigurationConflict)]
fn call_failures(#[case] source: Option<Sorter>, #[case] name: &str, #[case] kind: ErrorKind) {
    let deps = Dependencies::new();
    deps.bind::<dyn Storage, ChestStorage>();

    let err = deps.call(source.as_ref(), name).unwrap_err();
    assert_eq!(err.kind(), kind, "{err}");
}

#[test]
fn dispose_empties_the_registry() {
    let deps = Dependencies::new();
    deps.bind::<dyn Storage, ChestStorage>().as_singleton().unwrap();
    deps.resolve::<dyn Storage>().unwrap();

    deps.dispose();

    assert!(deps.is_empty());
    assert!(matches!(
        deps.resolve::<dyn Storage>(),
        Err(DiError::InterfaceTarget(_))
    ));
}
