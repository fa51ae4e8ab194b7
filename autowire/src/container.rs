//! The dependency resolution container.
//!
//! A [`Container`] owns one provider registry and one singleton cache.
//!
//! Public API:
//! - `declare::<C>().implements::<S>(cast)`: record that class `C` can stand in for `S`
//! - `register_instance` / `register_shared_instance`: a value that already exists
//! - `register_factory` / `register_singleton_factory`: a function producing `T`
//! - `register_class` / `register_singleton_class`: a constructor of class `T`
//! - `register_factory_of` / `register_singleton_factory_of`: a function with a shaped output
//! - `register`: a hand-built [`Provider`]
//! - `try_resolve` / `resolve` / `optional_resolve`: one value of a typed query
//! - `resolve_all` / `iter_all`: every value of a typed query, eagerly or lazily
//! - `has`: whether a query could be answered, without constructing anything
//!
//! Every `*_descriptor` variant takes a [`TypeDescriptor`] instead of a Rust
//! type and works with raw [`Value`]s.
//!
//! # Examples
//!
//! ```
//! use autowire::container::Container;
//! use autowire::query::Handle;
//!
//! trait Notifier {
//!     fn notify(&self, message: &str) -> String;
//! }
//!
//! struct Email;
//!
//! impl Notifier for Email {
//!     fn notify(&self, message: &str) -> String {
//!         format!("email: {}", message)
//!     }
//! }
//!
//! let container = Container::new();
//! container
//!     .declare::<Email>()
//!     .implements::<dyn Notifier>(|email| email)
//!     .unwrap();
//! container.register_singleton_class(|| Email).unwrap();
//!
//! let notifier = container.resolve::<Handle<dyn Notifier>>();
//! assert_eq!(notifier.notify("hi"), "email: hi");
//! ```

use std::cell::RefMut;
use std::marker::PhantomData;

use crate::cache::SingletonCache;
use crate::descriptor::{TypeDescriptor, TypeKey};
use crate::error::Error;
use crate::factory::Constructor;
use crate::hierarchy::Hierarchy;
use crate::produce::Produce;
use crate::provider::{Provider, ProviderId, ProviderKind};
use crate::query::Query;
use crate::registry::ProviderRegistry;
use crate::resolver::{Resolver, Session, Walker};
use crate::runtime::{Shared, Store};
use crate::scope::Scope;
use crate::value::Value;

#[cfg(feature = "tracing")]
use tracing::{debug, info};

/// The DI container.
pub struct Container {
    registry: Store<ProviderRegistry>,
    singletons: SingletonCache,
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    /// An empty container. It does not register itself as a provider.
    pub fn new() -> Self {
        #[cfg(feature = "tracing")]
        info!("Creating new container");

        Self {
            registry: Store::new(ProviderRegistry::new(Shared::new(Hierarchy::new()))),
            singletons: SingletonCache::new(),
        }
    }

    /// The class hierarchy shared by every object this container produces.
    pub fn hierarchy(&self) -> Shared<Hierarchy> {
        self.registry.borrow().hierarchy().clone()
    }

    /// Start declaring the supertypes of class `C`.
    pub fn declare<C: 'static>(&self) -> Declaration<'_, C> {
        Declaration {
            container: self,
            _marker: PhantomData,
        }
    }

    fn registry_mut(&self) -> Result<RefMut<'_, ProviderRegistry>, Error> {
        self.registry
            .try_borrow_mut()
            .map_err(|_| Error::registry_locked())
    }

    fn resolver(&self) -> Resolver<'_> {
        Resolver::new(self.registry.borrow(), &self.singletons)
    }

    /// Register a hand-built provider.
    ///
    /// Fails with `UnsupportedAnnotation` when one of its descriptors is
    /// outside the supported grammar, and with `RegistryLocked` while an
    /// [`IterAll`] view is alive. Either way the container is unchanged.
    pub fn register(&self, provider: Provider) -> Result<ProviderId, Error> {
        self.registry_mut()?.register(provider)
    }

    /// Register a value as a singleton of its own class.
    pub fn register_instance<T: 'static>(&self, value: T) -> Result<ProviderId, Error> {
        self.register_shared_instance(Shared::new(value))
    }

    /// Register an already shared value; every resolution returns this very value.
    pub fn register_shared_instance<T: 'static>(&self, value: Shared<T>) -> Result<ProviderId, Error> {
        let object = self.hierarchy().object(value);
        self.register(Provider::instance(
            std::any::type_name::<T>(),
            TypeKey::of::<T>(),
            Value::Object(object),
        ))
    }

    /// Register a function producing `T`, invoked for every resolution.
    pub fn register_factory<F, Args>(&self, factory: F) -> Result<ProviderId, Error>
    where
        F: Constructor<Args>,
    {
        self.register(constructor_provider(factory, ProviderKind::Factory, Scope::Transient))
    }

    /// Register a function producing `T`, invoked at most once.
    pub fn register_singleton_factory<F, Args>(&self, factory: F) -> Result<ProviderId, Error>
    where
        F: Constructor<Args>,
    {
        self.register(constructor_provider(factory, ProviderKind::Factory, Scope::Singleton))
    }

    /// Register the constructor of class `T`, invoked for every resolution.
    pub fn register_class<F, Args>(&self, constructor: F) -> Result<ProviderId, Error>
    where
        F: Constructor<Args>,
    {
        self.register(constructor_provider(constructor, ProviderKind::Class, Scope::Transient))
    }

    /// Register the constructor of class `T`, invoked at most once.
    pub fn register_singleton_class<F, Args>(&self, constructor: F) -> Result<ProviderId, Error>
    where
        F: Constructor<Args>,
    {
        self.register(constructor_provider(constructor, ProviderKind::Class, Scope::Singleton))
    }

    /// Register a function whose output has a [`Produce`] shape.
    pub fn register_factory_of<F, Args>(&self, factory: F) -> Result<ProviderId, Error>
    where
        F: Constructor<Args>,
        F::Output: Produce,
    {
        self.register(producer_provider(factory, Scope::Transient))
    }

    pub fn register_singleton_factory_of<F, Args>(&self, factory: F) -> Result<ProviderId, Error>
    where
        F: Constructor<Args>,
        F::Output: Produce,
    {
        self.register(producer_provider(factory, Scope::Singleton))
    }

    /// Resolve a typed query.
    ///
    /// The query is resolved the way a parameter of its type would be, so
    /// [`Defaulted`](crate::query::Defaulted) and
    /// [`Variadic`](crate::query::Variadic) behave the same here.
    pub fn try_resolve<Q: Query>(&self) -> Result<Q, Error> {
        let parameter = Q::parameter(0);
        parameter.descriptor.validate()?;

        #[cfg(feature = "tracing")]
        debug!("Resolving {}", parameter.descriptor);

        let value = self
            .resolver()
            .resolve_parameter(&parameter, &mut Session::new())?;
        Q::extract(value)
    }

    /// Resolve a typed query, panicking when it cannot be resolved.
    pub fn resolve<Q: Query>(&self) -> Q {
        self.try_resolve::<Q>()
            .unwrap_or_else(|err| panic!("{}", err))
    }

    pub fn optional_resolve<Q: Query>(&self) -> Option<Q> {
        self.try_resolve::<Q>().ok()
    }

    pub fn resolve_descriptor(&self, descriptor: &TypeDescriptor) -> Result<Value, Error> {
        descriptor.validate()?;
        self.resolver().resolve_one(descriptor, &mut Session::new())
    }

    /// Every value of a typed query, in registration order.
    ///
    /// Values that do not extract as `Q` are skipped.
    pub fn resolve_all<Q: Query>(&self) -> Vec<Q> {
        self.iter_all::<Q>().collect()
    }

    /// Every value of `descriptor`; empty when nothing matches or the
    /// descriptor is invalid.
    pub fn resolve_all_descriptor(&self, descriptor: &TypeDescriptor) -> Vec<Value> {
        self.iter_all_descriptor(descriptor).collect()
    }

    /// Lazy view over every value of a typed query.
    ///
    /// Single pass. Each call starts afresh: non-singleton providers run again.
    /// Registration fails with `RegistryLocked` while the view is alive.
    pub fn iter_all<Q: Query>(&self) -> IterAll<'_, Q> {
        IterAll {
            values: self.iter_all_descriptor(&Q::descriptor()),
            _marker: PhantomData,
        }
    }

    pub fn iter_all_descriptor(&self, descriptor: &TypeDescriptor) -> Values<'_> {
        let walker = match descriptor.validate() {
            Ok(()) => Some(Walker::new(descriptor.clone())),
            Err(_) => None,
        };
        Values {
            resolver: self.resolver(),
            session: Session::new(),
            walker,
        }
    }

    /// Whether the query could be answered, without constructing anything.
    pub fn has<Q: Query>(&self) -> bool {
        self.registry.borrow().covers(&Q::descriptor())
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.registry.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.borrow().is_empty()
    }

    /// Number of singletons built so far.
    pub fn singletons(&self) -> usize {
        self.singletons.len()
    }
}

fn constructor_provider<F, Args>(constructor: F, kind: ProviderKind, scope: Scope) -> Provider
where
    F: Constructor<Args>,
{
    let provider = Provider::new(
        std::any::type_name::<F::Output>(),
        kind,
        TypeDescriptor::concrete::<F::Output>(),
        move |args, hierarchy| {
            let value = constructor.call(args)?;
            Ok(Value::Object(hierarchy.object(Shared::new(value))))
        },
    )
    .with_scope(scope)
    .with_parameters(F::parameters());

    match kind {
        ProviderKind::Class => provider.with_class(TypeKey::of::<F::Output>()),
        _ => provider,
    }
}

fn producer_provider<F, Args>(factory: F, scope: Scope) -> Provider
where
    F: Constructor<Args>,
    F::Output: Produce,
{
    Provider::new(
        std::any::type_name::<F::Output>(),
        ProviderKind::Factory,
        <F::Output as Produce>::descriptor(),
        move |args, hierarchy| factory.call(args)?.into_value(hierarchy),
    )
    .with_scope(scope)
    .with_parameters(F::parameters())
}

/// Supertype declarations for class `C`.
pub struct Declaration<'c, C> {
    container: &'c Container,
    _marker: PhantomData<fn() -> C>,
}

impl<C: 'static> Declaration<'_, C> {
    /// `C` can be viewed as `S` through `cast`, usually an unsizing coercion.
    ///
    /// Providers of `C` already registered become candidates for `S` too.
    pub fn implements<S: ?Sized + 'static>(
        self,
        cast: impl Fn(Shared<C>) -> Shared<S> + 'static,
    ) -> Result<Self, Error> {
        let mut registry = self.container.registry_mut()?;
        registry.hierarchy().declare::<C, S>(cast);
        registry.reindex();
        drop(registry);
        Ok(self)
    }
}

/// Lazy values of a descriptor query. See [`Container::iter_all_descriptor`].
pub struct Values<'c> {
    resolver: Resolver<'c>,
    session: Session,
    walker: Option<Walker>,
}

impl Iterator for Values<'_> {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        self.walker
            .as_mut()?
            .next(&self.resolver, &mut self.session)
    }
}

/// Lazy typed values of a query. See [`Container::iter_all`].
pub struct IterAll<'c, Q> {
    values: Values<'c>,
    _marker: PhantomData<fn() -> Q>,
}

impl<Q: Query> Iterator for IterAll<'_, Q> {
    type Item = Q;

    fn next(&mut self) -> Option<Q> {
        loop {
            match Q::extract(self.values.next()?) {
                Ok(item) => return Some(item),
                Err(_err) => {
                    #[cfg(feature = "tracing")]
                    debug!("Skipping a value that is not a {}: {}", std::any::type_name::<Q>(), _err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::error::{ErrorKind, ResolutionKind};
    use crate::query::Handle;

    struct Config {
        port: u16,
    }

    struct Server {
        config: Handle<Config>,
    }

    trait Endpoint {
        fn path(&self) -> &str;
    }

    struct Health;

    impl Endpoint for Health {
        fn path(&self) -> &str {
            "/health"
        }
    }

    #[test]
    fn register_and_resolve_instance() {
        let container = Container::new();
        container.register_instance(Config { port: 8080 }).unwrap();

        let config = container.resolve::<Handle<Config>>();
        assert_eq!(config.port, 8080);
        assert_eq!(container.len(), 1);
    }

    #[test]
    fn shared_instance_keeps_identity() {
        let container = Container::new();
        let config = Rc::new(Config { port: 1 });
        container.register_shared_instance(config.clone()).unwrap();

        let resolved = container.resolve::<Handle<Config>>().shared().unwrap();
        assert!(Rc::ptr_eq(&config, &resolved));
    }

    #[test]
    fn class_dependencies_are_injected() {
        let container = Container::new();
        container.register_instance(Config { port: 3000 }).unwrap();
        container
            .register_class(|config: Handle<Config>| Server { config })
            .unwrap();

        let server = container.resolve::<Handle<Server>>();
        assert_eq!(server.config.port, 3000);
    }

    #[test]
    fn try_resolve_reports_missing_providers() {
        let container = Container::new();
        let err = container.try_resolve::<Handle<Config>>().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Resolution(ResolutionKind::NoProvider));
        assert!(container.optional_resolve::<Handle<Config>>().is_none());
    }

    #[test]
    #[should_panic(expected = "NoProvider")]
    fn resolve_panics_on_missing_providers() {
        Container::new().resolve::<Handle<Config>>();
    }

    #[test]
    fn late_declaration_reaches_registered_providers() {
        let container = Container::new();
        container.register_class(|| Health).unwrap();
        assert!(!container.has::<Handle<dyn Endpoint>>());

        container
            .declare::<Health>()
            .implements::<dyn Endpoint>(|health| health)
            .unwrap();
        assert!(container.has::<Handle<dyn Endpoint>>());
        assert_eq!(container.resolve::<Handle<dyn Endpoint>>().path(), "/health");
    }

    #[test]
    fn registration_is_locked_while_iterating() {
        let container = Container::new();
        container.register_instance(Config { port: 1 }).unwrap();

        let mut view = container.iter_all::<Handle<Config>>();
        assert!(view.next().is_some());
        let err = container.register_instance(Config { port: 2 }).unwrap_err();
        assert_eq!(err.kind, ErrorKind::RegistryLocked);
        drop(view);

        container.register_instance(Config { port: 2 }).unwrap();
        assert_eq!(container.resolve_all::<Handle<Config>>().len(), 2);
    }

    #[test]
    fn singleton_factory_runs_once() {
        let container = Container::new();
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        container
            .register_singleton_factory(move || {
                counter.set(counter.get() + 1);
                Config { port: 0 }
            })
            .unwrap();

        let first = container.resolve::<Handle<Config>>();
        let second = container.resolve::<Handle<Config>>();
        assert!(Handle::ptr_eq(&first, &second));
        assert_eq!(calls.get(), 1);
        assert_eq!(container.singletons(), 1);
    }

    #[test]
    fn invalid_query_descriptor_is_rejected() {
        let container = Container::new();
        let err = container
            .resolve_descriptor(&TypeDescriptor::union(vec![TypeDescriptor::Any]))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnsupportedAnnotation);
        assert!(
            container
                .resolve_all_descriptor(&TypeDescriptor::tuple_of(vec![]))
                .is_empty()
        );
    }

    #[test]
    fn container_does_not_provide_itself() {
        let container = Container::new();
        assert!(container.is_empty());

        let err = container.try_resolve::<Handle<Container>>().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Resolution(ResolutionKind::NoProvider));
    }
}
