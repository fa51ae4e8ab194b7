use std::cell::{Cell, RefCell};
use std::rc::Rc;

use autowire::{
    Container, Defaulted, Dynamic, ErrorKind, Handle, Iterable, Many, Obj, Object, OneOf,
    ResolutionKind, TypeOf, Variadic,
};

fn counter() -> (Rc<Cell<usize>>, Rc<Cell<usize>>) {
    let calls = Rc::new(Cell::new(0));
    (calls.clone(), calls)
}

trait Storage {
    fn describe(&self) -> String;
}

struct Postgres {
    url: String,
}

impl Storage for Postgres {
    fn describe(&self) -> String {
        format!("postgres at {}", self.url)
    }
}

#[test]
fn instances_resolve_to_the_registered_value() {
    let container = Container::new();
    let original = Rc::new(Postgres {
        url: "localhost".into(),
    });
    container.register_shared_instance(original.clone()).unwrap();

    for _ in 0..3 {
        let resolved = container.resolve::<Handle<Postgres>>();
        assert!(Rc::ptr_eq(&original, &resolved.shared().unwrap()));
    }
}

#[test]
fn subclasses_satisfy_their_declared_supertypes() {
    let container = Container::new();
    container
        .declare::<Postgres>()
        .implements::<dyn Storage>(|postgres| postgres)
        .unwrap();
    container
        .register_class(|| Postgres { url: "db".into() })
        .unwrap();

    let storage = container.resolve::<Handle<dyn Storage>>();
    assert_eq!(storage.describe(), "postgres at db");
    assert!(storage.object().downcast::<Postgres>().is_ok());
}

struct Request {
    id: usize,
}

#[test]
fn singleton_classes_are_shared_and_transient_ones_are_not() {
    let container = Container::new();
    let (calls, seen) = counter();
    container
        .register_singleton_class(move || {
            calls.set(calls.get() + 1);
            Postgres { url: "shared".into() }
        })
        .unwrap();

    let first = container.resolve::<Handle<Postgres>>();
    let second = container.resolve::<Handle<Postgres>>();
    assert!(Handle::ptr_eq(&first, &second));
    assert_eq!(seen.get(), 1);

    let (calls, seen) = counter();
    container
        .register_class(move || {
            calls.set(calls.get() + 1);
            Request { id: calls.get() }
        })
        .unwrap();

    let first = container.resolve::<Handle<Request>>();
    let second = container.resolve::<Handle<Request>>();
    assert!(!Handle::ptr_eq(&first, &second));
    assert_eq!((first.id, second.id), (1, 2));
    assert_eq!(seen.get(), 2);
}

#[test]
fn optional_query_of_unregistered_type_is_absent() {
    let container = Container::new();
    assert!(container.resolve::<Option<Handle<Postgres>>>().is_none());
    assert!(container.try_resolve::<Option<Handle<dyn Storage>>>().unwrap().is_none());
}

struct Cache;
struct Disk;

#[test]
fn union_prefers_the_first_arm() {
    let container = Container::new();
    container.register_class(|| Disk).unwrap();
    container.register_class(|| Cache).unwrap();

    let either = container.resolve::<OneOf<Handle<Cache>, Handle<Disk>>>();
    assert!(matches!(either, OneOf::First(_)));

    let either = container.resolve::<OneOf<Handle<Request>, Handle<Disk>>>();
    assert!(either.second().is_some());

    let err = container
        .try_resolve::<OneOf<Handle<Request>, Handle<Postgres>>>()
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Resolution(ResolutionKind::NoUnionBranch));
}

#[test]
fn collections_without_providers_are_empty() {
    let container = Container::new();
    assert!(container.resolve_all::<Handle<Postgres>>().is_empty());
    assert!(container.resolve::<Vec<Handle<Postgres>>>().is_empty());
    assert_eq!(container.resolve::<Iterable<Handle<dyn Storage>>>().count(), 0);
}

struct Parent {
    name: &'static str,
    child: Handle<Child>,
}

struct Child {
    parent: Handle<Parent>,
}

#[test]
fn cycles_are_closed_with_a_proxy() {
    let container = Container::new();
    container
        .register_class(|child: Handle<Child>| Parent {
            name: "root",
            child,
        })
        .unwrap();
    container
        .register_class(|parent: Handle<Parent>| Child { parent })
        .unwrap();

    let parent = container.resolve::<Handle<Parent>>();
    let back = &parent.child.parent;

    assert!(back.is_proxy());
    assert!(!Handle::ptr_eq(&parent, back));
    assert_eq!(back.name, "root");
    assert!(Rc::ptr_eq(&parent.shared().unwrap(), &back.shared().unwrap()));
}

struct Eager {
    _peer: Handle<Peer>,
}

struct Peer;

#[test]
fn proxy_is_unusable_inside_the_cycle() {
    let container = Container::new();
    let observed = Rc::new(RefCell::new(None));
    let sink = observed.clone();

    container
        .register_class(|peer: Handle<Peer>| Eager { _peer: peer })
        .unwrap();
    container
        .register_class(move |eager: Handle<Eager>| {
            *sink.borrow_mut() = Some(eager.get().map(|_| ()).unwrap_err().kind);
            Peer
        })
        .unwrap();

    container.resolve::<Handle<Eager>>();
    assert_eq!(*observed.borrow(), Some(ErrorKind::ProxyNotBound));
}

trait Greeter {
    fn greet(&self) -> &'static str;
}

struct ConcreteGreeter;

impl Greeter for ConcreteGreeter {
    fn greet(&self) -> &'static str {
        "hello"
    }
}

struct App {
    greeter: Handle<dyn Greeter>,
}

#[test]
fn application_receives_the_registered_service() {
    let container = Container::new();
    container
        .declare::<ConcreteGreeter>()
        .implements::<dyn Greeter>(|greeter| greeter)
        .unwrap();
    let service = Rc::new(ConcreteGreeter);
    container.register_shared_instance(service.clone()).unwrap();
    container
        .register_class(|greeter: Handle<dyn Greeter>| App { greeter })
        .unwrap();

    let app = container.resolve::<Handle<App>>();
    assert_eq!(app.greeter.greet(), "hello");
    let resolved = app.greeter.object().downcast::<ConcreteGreeter>().unwrap();
    assert!(Rc::ptr_eq(&service, &resolved));
}

struct Left(u8);
struct Right(u8);

#[test]
fn exact_tuple_provider_beats_element_assembly() {
    let container = Container::new();
    container.register_class(|| Left(2)).unwrap();
    container.register_class(|| Right(2)).unwrap();
    container
        .register_factory_of(|| (Obj::new(Left(1)), Obj::new(Right(1))))
        .unwrap();

    let (left, right) = container.resolve::<(Handle<Left>, Handle<Right>)>();
    assert_eq!((left.0, right.0), (1, 1));
    assert_eq!(container.resolve::<Handle<Left>>().0, 2);
}

#[test]
fn broad_factories_are_searched_at_run_time() {
    let container = Container::new();
    container
        .register_factory_of(|| OneOf::<Obj<Left>, Obj<Right>>::Second(Obj::new(Right(5))))
        .unwrap();
    container
        .register_factory_of(|| Option::<Obj<Cache>>::None)
        .unwrap();

    assert_eq!(container.resolve::<Handle<Right>>().0, 5);

    let err = container.try_resolve::<Handle<Left>>().unwrap_err();
    assert!(err.is_resolution());
    assert!(container.resolve::<Option<Handle<Cache>>>().is_none());
}

#[test]
fn any_query_returns_the_first_object() {
    let container = Container::new();
    container
        .register_factory_of(|| Dynamic::new(Disk))
        .unwrap();
    container.register_class(|| Cache).unwrap();

    let object = container.resolve::<Object>();
    assert!(object.downcast::<Disk>().is_ok());
    assert_eq!(container.resolve_all::<Object>().len(), 2);
    assert!(container.resolve::<Option<Handle<Disk>>>().is_some());
}

struct Pair {
    left: Handle<Left>,
    right: Handle<Right>,
}

#[test]
fn weak_provider_runs_once_per_call() {
    let container = Container::new();
    let (calls, seen) = counter();
    container
        .register_factory_of(move || {
            calls.set(calls.get() + 1);
            (Obj::new(Left(7)), Obj::new(Right(8)))
        })
        .unwrap();
    container
        .register_class(|left: Handle<Left>, right: Handle<Right>| Pair { left, right })
        .unwrap();

    let pair = container.resolve::<Handle<Pair>>();
    assert_eq!((pair.left.0, pair.right.0), (7, 8));
    assert_eq!(seen.get(), 1);

    container.resolve::<Handle<Pair>>();
    assert_eq!(seen.get(), 2);
}

struct Plugin(usize);

#[test]
fn lazy_sequence_is_pulled_to_the_first_match() {
    let container = Container::new();
    let (pulled, seen) = counter();
    container
        .register_factory_of(move || {
            let pulled = pulled.clone();
            Many::new((0..5).map(move |n| {
                pulled.set(pulled.get() + 1);
                Obj::new(Plugin(n))
            }))
        })
        .unwrap();

    assert_eq!(container.resolve::<Handle<Plugin>>().0, 0);
    assert_eq!(seen.get(), 1);
}

trait Node {
    fn label(&self) -> &'static str;
}

struct Root {
    leaf: Handle<Leaf>,
}

impl Node for Root {
    fn label(&self) -> &'static str {
        "root"
    }
}

struct Leaf {
    up: Handle<dyn Node>,
}

#[test]
fn singleton_in_flight_is_reached_through_a_supertype() {
    let container = Container::new();
    container
        .declare::<Root>()
        .implements::<dyn Node>(|root| root)
        .unwrap();
    let (calls, seen) = counter();
    container
        .register_singleton_class(move |leaf: Handle<Leaf>| {
            calls.set(calls.get() + 1);
            Root { leaf }
        })
        .unwrap();
    container
        .register_class(|up: Handle<dyn Node>| Leaf { up })
        .unwrap();

    let root = container.resolve::<Handle<Root>>();
    assert!(root.leaf.up.is_proxy());
    assert_eq!(root.leaf.up.label(), "root");
    assert_eq!(seen.get(), 1);
    assert!(Handle::ptr_eq(&root, &container.resolve::<Handle<Root>>()));
}

trait Member {
    fn name(&self) -> &'static str;
}

struct Hub {
    members: Vec<Handle<dyn Member>>,
}

impl Member for Hub {
    fn name(&self) -> &'static str {
        "hub"
    }
}

#[test]
fn singleton_collects_itself_through_a_supertype() {
    let container = Container::new();
    container
        .declare::<Hub>()
        .implements::<dyn Member>(|hub| hub)
        .unwrap();
    container
        .register_singleton_class(|members: Vec<Handle<dyn Member>>| Hub { members })
        .unwrap();

    let hub = container.resolve::<Handle<Hub>>();
    assert_eq!(hub.members.len(), 1);

    let member = &hub.members[0];
    assert!(member.is_proxy());
    assert_eq!(member.name(), "hub");
    let inner = member.object().downcast::<Hub>().unwrap();
    assert!(Rc::ptr_eq(&hub.shared().unwrap(), &inner));
}

#[derive(Debug)]
struct Owner {
    _backref: Handle<Backref>,
    _missing: Handle<Missing>,
}

#[derive(Debug)]
struct Backref;

#[derive(Debug)]
struct Missing;

#[test]
fn failed_cycle_leaves_proxy_unbound() {
    let container = Container::new();
    let held: Rc<RefCell<Option<Handle<Owner>>>> = Rc::new(RefCell::new(None));
    let slot = held.clone();
    container
        .register_class(|backref: Handle<Backref>, missing: Handle<Missing>| Owner {
            _backref: backref,
            _missing: missing,
        })
        .unwrap();
    container
        .register_class(move |owner: Handle<Owner>| {
            slot.borrow_mut().replace(owner);
            Backref
        })
        .unwrap();

    let err = container.try_resolve::<Handle<Owner>>().unwrap_err();
    assert_eq!(err.kind, ErrorKind::Resolution(ResolutionKind::NoProvider));

    let owner = held.borrow_mut().take().unwrap();
    assert!(owner.is_proxy());
    assert_eq!(owner.get().unwrap_err().kind, ErrorKind::ProxyNotBound);
}

struct Pool;

struct LeftUser {
    pool: Handle<Pool>,
}

struct RightUser {
    pool: Handle<Pool>,
}

struct Top {
    left: Handle<LeftUser>,
    right: Handle<RightUser>,
}

#[test]
fn singleton_diamond_is_not_a_cycle() {
    let container = Container::new();
    let (calls, builds) = counter();
    container
        .register_singleton_class(move || {
            calls.set(calls.get() + 1);
            Pool
        })
        .unwrap();
    container
        .register_class(|pool: Handle<Pool>| LeftUser { pool })
        .unwrap();
    container
        .register_class(|pool: Handle<Pool>| RightUser { pool })
        .unwrap();
    container
        .register_class(|left: Handle<LeftUser>, right: Handle<RightUser>| Top { left, right })
        .unwrap();

    let top = container.resolve::<Handle<Top>>();
    assert_eq!(builds.get(), 1);
    assert!(!top.left.pool.is_proxy());
    assert!(!top.right.pool.is_proxy());
    assert!(Handle::ptr_eq(&top.left.pool, &top.right.pool));
}

#[derive(Default)]
struct Retries(u8);

struct Hook;

struct Policy {
    retries: Defaulted<Retries>,
    hooks: Variadic<Handle<Hook>>,
}

#[test]
fn defaulted_and_variadic_parameters() {
    let container = Container::new();
    container
        .register_class(|retries: Defaulted<Retries>, hooks: Variadic<Handle<Hook>>| Policy {
            retries,
            hooks,
        })
        .unwrap();

    let policy = container.resolve::<Handle<Policy>>();
    assert_eq!(policy.retries.get().unwrap().0, 0);
    assert!(policy.hooks.is_empty());

    container.register_instance(Retries(3)).unwrap();
    container.register_class(|| Hook).unwrap();
    container.register_class(|| Hook).unwrap();

    let policy = container.resolve::<Handle<Policy>>();
    assert_eq!(policy.retries.get().unwrap().0, 3);
    assert_eq!(policy.hooks.len(), 2);
}

struct Widget;

trait Component {}

impl Component for Widget {}

#[test]
fn type_queries_do_not_construct() {
    let container = Container::new();
    container
        .declare::<Widget>()
        .implements::<dyn Component>(|widget| widget)
        .unwrap();
    container
        .register_class(|| -> Widget { unreachable!("type queries never construct") })
        .unwrap();

    assert!(container.resolve::<TypeOf<Widget>>().key().is::<Widget>());
    assert!(container.resolve::<TypeOf<dyn Component>>().key().is::<Widget>());
    assert_eq!(container.resolve_all::<TypeOf<dyn Component>>().len(), 1);
    assert_eq!(container.singletons(), 0);
}

#[test]
fn iter_all_is_lazy_and_starts_afresh() {
    let container = Container::new();
    let (calls, seen) = counter();
    for _ in 0..3 {
        let calls = calls.clone();
        container
            .register_factory(move || {
                calls.set(calls.get() + 1);
                Disk
            })
            .unwrap();
    }

    assert!(container.iter_all::<Handle<Disk>>().next().is_some());
    assert_eq!(seen.get(), 1);

    assert_eq!(container.resolve_all::<Handle<Disk>>().len(), 3);
    assert_eq!(seen.get(), 4);
}

#[test]
fn unsupported_annotations_leave_the_container_unchanged() {
    let container = Container::new();
    let err = container
        .register_factory(|_: Option<Option<Handle<Disk>>>| Cache)
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnsupportedAnnotation);
    assert!(container.is_empty());

    let err = container
        .try_resolve::<Option<Option<Handle<Disk>>>>()
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnsupportedAnnotation);
}

#[test]
fn has_does_not_construct() {
    let container = Container::new();
    container
        .register_class(|| -> Disk { unreachable!("has only consults the registry") })
        .unwrap();

    assert!(container.has::<Handle<Disk>>());
    assert!(!container.has::<Handle<Cache>>());
    assert!(container.has::<Option<Handle<Cache>>>());
}
