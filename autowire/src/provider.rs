//! Provider definitions for dependency resolution.
//!
//! A [`Provider`] is a registered way of obtaining values: a pre-built
//! instance, a factory function, or a class constructor. It declares the
//! parameters it needs, the shape of what it produces, and a type-erased build
//! function that turns resolved parameter values into the produced value.
//!
//! Providers are usually created by the typed registration methods of
//! [`Container`](crate::container::Container). Building one by hand is the
//! dynamic escape hatch for shapes the typed front end cannot spell.
//!
//! # Examples
//!
//! ```
//! use autowire::descriptor::TypeDescriptor;
//! use autowire::provider::{ParameterSpec, Provider, ProviderKind};
//! use autowire::scope::Scope;
//! use autowire::value::Value;
//! use std::rc::Rc;
//!
//! struct Config;
//! struct Service;
//!
//! let provider = Provider::new(
//!     "make_service",
//!     ProviderKind::Factory,
//!     TypeDescriptor::concrete::<Service>(),
//!     |_args, hierarchy| Ok(Value::Object(hierarchy.object(Rc::new(Service)))),
//! )
//! .with_scope(Scope::Singleton)
//! .with_parameters(vec![ParameterSpec::new(
//!     "config",
//!     TypeDescriptor::concrete::<Config>(),
//! )]);
//!
//! assert!(provider.scope.is_singleton());
//! assert_eq!(provider.parameters.len(), 1);
//! ```

use std::fmt;

use crate::descriptor::{TypeDescriptor, TypeKey};
use crate::error::Error;
use crate::hierarchy::Hierarchy;
use crate::runtime::Shared;
use crate::scope::Scope;
use crate::value::Value;

#[cfg(feature = "tracing")]
use tracing::debug;

/// Identity of a registered provider: its registration index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProviderId(usize);

impl ProviderId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "provider #{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderKind {
    /// A value supplied at registration time.
    Instance,
    /// A function whose return value is the product.
    Factory,
    /// A constructor of a concrete class.
    Class,
}

/// Produces a parameter's default value on demand.
pub type DefaultFn = Shared<dyn Fn(&Shared<Hierarchy>) -> Value>;

/// Type-erased build function: resolved arguments in, produced value out.
pub type BuildFn = Box<dyn Fn(Vec<Value>, &Shared<Hierarchy>) -> Result<Value, Error>>;

/// One declared parameter of a factory or constructor.
#[derive(Clone)]
pub struct ParameterSpec {
    pub name: String,
    pub descriptor: TypeDescriptor,
    pub default: Option<DefaultFn>,
    /// Collects every match of `descriptor` instead of exactly one.
    pub variadic: bool,
}

impl ParameterSpec {
    pub fn new(name: impl Into<String>, descriptor: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            descriptor,
            default: None,
            variadic: false,
        }
    }

    /// Use `default` whenever the parameter cannot be resolved.
    pub fn with_default(mut self, default: impl Fn(&Shared<Hierarchy>) -> Value + 'static) -> Self {
        self.default = Some(Shared::new(default));
        self
    }

    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

impl fmt::Debug for ParameterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterSpec")
            .field("name", &self.name)
            .field("descriptor", &self.descriptor)
            .field("default", &self.default.is_some())
            .field("variadic", &self.variadic)
            .finish()
    }
}

/// A registered means of producing values.
///
/// Immutable once registered. Identity is the [`ProviderId`] the registry
/// assigns, not any field of the provider.
pub struct Provider {
    pub name: String,
    pub kind: ProviderKind,
    pub scope: Scope,
    pub parameters: Vec<ParameterSpec>,
    /// Declared output shape.
    pub produces: TypeDescriptor,
    /// The concrete class created, for class and instance providers.
    pub class: Option<TypeKey>,
    build: BuildFn,
}

impl Provider {
    /// A transient provider without parameters.
    pub fn new(
        name: impl Into<String>,
        kind: ProviderKind,
        produces: TypeDescriptor,
        build: impl Fn(Vec<Value>, &Shared<Hierarchy>) -> Result<Value, Error> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            scope: Scope::Transient,
            parameters: Vec::new(),
            produces,
            class: None,
            build: Box::new(build),
        }
    }

    /// A singleton provider returning a value that already exists.
    pub fn instance(name: impl Into<String>, class: TypeKey, value: Value) -> Self {
        Self::new(
            name,
            ProviderKind::Instance,
            TypeDescriptor::Concrete(class),
            move |_, _| Ok(value.clone()),
        )
        .with_scope(Scope::Singleton)
        .with_class(class)
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_parameters(mut self, parameters: Vec<ParameterSpec>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_class(mut self, class: TypeKey) -> Self {
        self.class = Some(class);
        self
    }

    /// Run the build function with already-resolved arguments.
    pub(crate) fn build(&self, args: Vec<Value>, hierarchy: &Shared<Hierarchy>) -> Result<Value, Error> {
        #[cfg(feature = "tracing")]
        debug!("Invoking {} {} ({})", self.scope, self.name, self.produces);

        (self.build)(args, hierarchy)
    }

    /// Registration-time check of every descriptor the provider carries.
    pub fn validate(&self) -> Result<(), Error> {
        self.produces.validate()?;
        self.parameters
            .iter()
            .try_for_each(|parameter| parameter.descriptor.validate())
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("scope", &self.scope)
            .field("parameters", &self.parameters)
            .field("produces", &self.produces)
            .field("class", &self.class)
            .finish()
    }
}
