//! The resolution engine.
//!
//! A [`Resolver`] answers [`TypeDescriptor`] queries against a registry and a
//! singleton cache. Every top-level call runs in its own [`Session`], which
//! carries the resolution stack for cycle detection and the outputs of weak
//! candidates already invoked during the call.
//!
//! # Matching
//!
//! For a concrete query the strong candidates are tried first, in
//! registration order; the first one that constructs wins. Weak candidates
//! (providers of broader shapes) are consulted only when no strong candidate
//! exists: each is invoked at most once per call, and its output is searched
//! for an object that satisfies the query at run time.
//!
//! Failures to resolve are recoverable: an `Optional` query turns them into an
//! absent value, a `Union` moves on to its next arm, a defaulted parameter
//! falls back to its default. Every other error propagates.
//!
//! # Collections
//!
//! [`Resolver::resolve_all`] never fails: candidates that cannot be
//! constructed are skipped. The work is driven by a [`Walker`], which also
//! backs the lazy [`IterAll`](crate::container::IterAll) view.

use std::cell::Ref;
use std::collections::{HashMap, VecDeque};

use crate::cache::SingletonCache;
use crate::descriptor::{TypeDescriptor, TypeKey};
use crate::error::Error;
use crate::instance::Object;
use crate::provider::{ParameterSpec, ProviderId, ProviderKind};
use crate::registry::ProviderRegistry;
use crate::stack::ResolutionStack;
use crate::value::{Flatten, Value};

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

/// State of one top-level resolution call.
#[derive(Default)]
pub struct Session {
    stack: ResolutionStack,
    weak_results: HashMap<ProviderId, Value>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stack(&self) -> &ResolutionStack {
        &self.stack
    }
}

pub struct Resolver<'c> {
    registry: Ref<'c, ProviderRegistry>,
    singletons: &'c SingletonCache,
}

impl<'c> Resolver<'c> {
    pub fn new(registry: Ref<'c, ProviderRegistry>, singletons: &'c SingletonCache) -> Self {
        Self {
            registry,
            singletons,
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Resolve exactly one value for `descriptor`.
    pub fn resolve_one(
        &self,
        descriptor: &TypeDescriptor,
        session: &mut Session,
    ) -> Result<Value, Error> {
        match descriptor {
            TypeDescriptor::Concrete(key) => self.resolve_concrete(descriptor, key, session),
            TypeDescriptor::Optional(inner) => match self.resolve_one(inner, session) {
                Err(err) if err.is_resolution() => Ok(Value::Absent),
                other => other,
            },
            TypeDescriptor::Union(arms) => {
                for (index, arm) in arms.iter().enumerate() {
                    match self.resolve_one(arm, session) {
                        Ok(value) => return Ok(Value::Variant(index, Box::new(value))),
                        Err(err) if err.is_resolution() => continue,
                        Err(err) => return Err(err),
                    }
                }
                Err(Error::no_union_branch(&descriptor.to_string()))
            }
            TypeDescriptor::ListOf(inner) | TypeDescriptor::IterableOf(inner) => {
                Ok(Value::List(self.resolve_all(inner, session)))
            }
            TypeDescriptor::TupleOf(elements) => {
                if !self.registry.strong(descriptor).is_empty() {
                    return self.resolve_strong(descriptor, session);
                }
                let values = elements
                    .iter()
                    .map(|element| self.resolve_one(element, session))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Tuple(values))
            }
            TypeDescriptor::Any => self.resolve_any(session),
            TypeDescriptor::MetaTypeOf(inner) => {
                if !self.registry.strong(descriptor).is_empty() {
                    return self.resolve_strong(descriptor, session);
                }
                inner
                    .as_concrete()
                    .and_then(|key| self.class_keys(&key).into_iter().next())
                    .map(Value::Type)
                    .ok_or_else(|| Error::no_provider(&descriptor.to_string()))
            }
        }
    }

    /// Every value `descriptor` matches, in registration order.
    pub fn resolve_all(&self, descriptor: &TypeDescriptor, session: &mut Session) -> Vec<Value> {
        let mut walker = Walker::new(descriptor.clone());
        let mut values = Vec::new();
        while let Some(value) = walker.next(self, session) {
            values.push(value);
        }
        values
    }

    fn resolve_concrete(
        &self,
        descriptor: &TypeDescriptor,
        key: &TypeKey,
        session: &mut Session,
    ) -> Result<Value, Error> {
        if !self.registry.strong(descriptor).is_empty() {
            return self.resolve_strong(descriptor, session);
        }

        let mut last = None;
        for id in self.registry.weak(key) {
            #[cfg(feature = "tracing")]
            trace!("Trying weak candidate {} for {}", id, descriptor);

            match self.obtain(descriptor, id, true, session) {
                Ok(value) => {
                    if let Some(object) = value.objects().find(|object| object.satisfies(key)) {
                        return Ok(Value::Object(object));
                    }
                }
                Err(err) if err.is_resolution() => last = Some(err),
                Err(err) => return Err(err),
            }
        }

        Err(match last {
            Some(cause) => Error::no_constructible_provider(&descriptor.to_string(), &cause),
            None => Error::no_provider(&descriptor.to_string()),
        })
    }

    /// First strong candidate of `descriptor` that constructs.
    fn resolve_strong(
        &self,
        descriptor: &TypeDescriptor,
        session: &mut Session,
    ) -> Result<Value, Error> {
        let mut last = None;
        for &id in self.registry.strong(descriptor) {
            #[cfg(feature = "tracing")]
            trace!("Trying strong candidate {} for {}", id, descriptor);

            match self.obtain(descriptor, id, false, session) {
                Ok(value) => return Ok(value),
                Err(err) if err.is_resolution() => last = Some(err),
                Err(err) => return Err(err),
            }
        }

        Err(match last {
            Some(cause) => Error::no_constructible_provider(&descriptor.to_string(), &cause),
            None => Error::no_provider(&descriptor.to_string()),
        })
    }

    fn resolve_any(&self, session: &mut Session) -> Result<Value, Error> {
        let ids: Vec<ProviderId> = self.registry.providers().map(|(id, _)| id).collect();
        for id in ids {
            match self.obtain(&TypeDescriptor::Any, id, true, session) {
                Ok(value) => {
                    if let Some(object) = value.objects().next() {
                        return Ok(Value::Object(object));
                    }
                }
                Err(err) if err.is_resolution() => continue,
                Err(err) => return Err(err),
            }
        }
        Err(Error::no_provider(&TypeDescriptor::Any.to_string()))
    }

    /// Classes of the class and instance providers strong for `key`.
    fn class_keys(&self, key: &TypeKey) -> Vec<TypeKey> {
        self.registry
            .strong(&TypeDescriptor::Concrete(*key))
            .iter()
            .map(|id| self.registry.get(*id))
            .filter(|provider| matches!(provider.kind, ProviderKind::Class | ProviderKind::Instance))
            .filter_map(|provider| provider.class)
            .collect()
    }

    /// The output of provider `id` for a query of `descriptor`.
    ///
    /// Checks, in order: the singleton cache, the outputs of weak candidates
    /// already invoked in this call, and the resolution stack. Only then is
    /// the provider constructed.
    fn obtain(
        &self,
        descriptor: &TypeDescriptor,
        id: ProviderId,
        weak: bool,
        session: &mut Session,
    ) -> Result<Value, Error> {
        let singleton = self.registry.get(id).scope.is_singleton();
        if singleton {
            if let Some(value) = self.singletons.get(id) {
                return Ok(value);
            }
        }
        if weak {
            if let Some(value) = session.weak_results.get(&id) {
                #[cfg(feature = "tracing")]
                trace!("Reusing output of {} within this call", id);

                return Ok(value.clone());
            }
        }
        if let Some(depth) = session.stack.find(descriptor, id) {
            return Ok(Value::Object(Object::proxy(session.stack.proxy(depth))));
        }

        let value = if singleton {
            self.singletons
                .get_or_create(id, || self.construct(descriptor, id, session))?
        } else {
            self.construct(descriptor, id, session)?
        };

        if weak && !singleton {
            session.weak_results.insert(id, value.clone());
        }
        Ok(value)
    }

    /// Resolve the parameters of `id` and run its build function inside a
    /// stack frame, then bind or fail the frame's proxy.
    fn construct(
        &self,
        descriptor: &TypeDescriptor,
        id: ProviderId,
        session: &mut Session,
    ) -> Result<Value, Error> {
        let provider = self.registry.get(id);
        session
            .stack
            .push(descriptor.clone(), id, provider.scope.is_singleton());

        let result = self.invoke(id, session);

        let frame = session.stack.pop();
        if let Some(cell) = frame.proxy_cell() {
            match result.as_ref().ok().and_then(|value| bind_target(frame.descriptor(), value)) {
                Some(target) => cell.bind(target),
                None => cell.fail(),
            }
        }
        result
    }

    fn invoke(&self, id: ProviderId, session: &mut Session) -> Result<Value, Error> {
        let provider = self.registry.get(id);
        let mut args = Vec::with_capacity(provider.parameters.len());
        for parameter in &provider.parameters {
            args.push(self.resolve_parameter(parameter, session)?);
        }
        provider.build(args, self.registry.hierarchy())
    }

    /// Resolve one declared parameter.
    ///
    /// A variadic parameter collects every match and never fails. A defaulted
    /// parameter uses its default when the query cannot be resolved.
    pub fn resolve_parameter(
        &self,
        parameter: &ParameterSpec,
        session: &mut Session,
    ) -> Result<Value, Error> {
        if parameter.variadic {
            return Ok(Value::List(self.resolve_all(&parameter.descriptor, session)));
        }
        match (self.resolve_one(&parameter.descriptor, session), &parameter.default) {
            (Err(err), Some(default)) if err.is_resolution() => {
                #[cfg(feature = "tracing")]
                debug!("Using the default for parameter {}", parameter.name);

                Ok(default(self.registry.hierarchy()))
            }
            (result, _) => result,
        }
    }
}

/// The part of a produced value a proxy for `descriptor` stands in for.
fn bind_target(descriptor: &TypeDescriptor, value: &Value) -> Option<Value> {
    match descriptor {
        TypeDescriptor::Concrete(key) => value
            .clone()
            .objects()
            .find(|object| object.satisfies(key))
            .map(Value::Object),
        TypeDescriptor::Any => value.clone().objects().next().map(Value::Object),
        _ => Some(value.clone()),
    }
}

/// What to keep from a provider's output in a collection walk.
enum Keep {
    /// Every object satisfying the key; every object at all without one.
    Objects(Option<TypeKey>),
    /// The output as it is.
    Whole,
}

enum Step {
    Expand(TypeDescriptor, Vec<usize>),
    Invoke {
        descriptor: TypeDescriptor,
        id: ProviderId,
        weak: bool,
        keep: Keep,
        path: Vec<usize>,
    },
    Drain {
        objects: Flatten,
        key: Option<TypeKey>,
        path: Vec<usize>,
    },
    Resolve(TypeDescriptor, Vec<usize>),
    Emit(Value, Vec<usize>),
}

/// Incremental evaluation of a collection query.
///
/// The walker only holds a plan; each call to [`Walker::next`] advances it
/// until one value is ready, so a consumer that stops early never invokes
/// the remaining candidates. `path` records the union arms a step was
/// reached through, outermost first, and tags the values it yields.
pub struct Walker {
    plan: VecDeque<Step>,
}

impl Walker {
    pub fn new(descriptor: TypeDescriptor) -> Self {
        Self {
            plan: VecDeque::from([Step::Expand(descriptor, Vec::new())]),
        }
    }

    pub fn next(&mut self, resolver: &Resolver<'_>, session: &mut Session) -> Option<Value> {
        loop {
            match self.plan.pop_front()? {
                Step::Expand(descriptor, path) => self.expand(resolver, descriptor, path),
                Step::Invoke {
                    descriptor,
                    id,
                    weak,
                    keep,
                    path,
                } => match resolver.obtain(&descriptor, id, weak, session) {
                    // A cycle hit on a strong candidate stands in for it as is.
                    Ok(Value::Object(object)) if !weak && object.is_pending() => {
                        return Some(tag(Value::Object(object), &path));
                    }
                    Ok(value) => match keep {
                        Keep::Whole => return Some(tag(value, &path)),
                        Keep::Objects(key) => self.plan.push_front(Step::Drain {
                            objects: value.objects(),
                            key,
                            path,
                        }),
                    },
                    Err(_err) => {
                        #[cfg(feature = "tracing")]
                        debug!("Skipping {} for {}: {}", id, descriptor, _err);
                    }
                },
                Step::Drain {
                    mut objects,
                    key,
                    path,
                } => {
                    let found = objects
                        .by_ref()
                        .find(|object| key.is_none_or(|key| object.satisfies(&key)));
                    if let Some(object) = found {
                        let value = tag(Value::Object(object), &path);
                        self.plan.push_front(Step::Drain { objects, key, path });
                        return Some(value);
                    }
                }
                Step::Resolve(descriptor, path) => match resolver.resolve_one(&descriptor, session) {
                    Ok(value) => return Some(tag(value, &path)),
                    Err(_err) => {
                        #[cfg(feature = "tracing")]
                        debug!("Skipping {}: {}", descriptor, _err);
                    }
                },
                Step::Emit(value, path) => return Some(tag(value, &path)),
            }
        }
    }

    fn expand(&mut self, resolver: &Resolver<'_>, descriptor: TypeDescriptor, path: Vec<usize>) {
        let registry = resolver.registry();
        let steps: Vec<Step> = match &descriptor {
            TypeDescriptor::Concrete(key) => registry
                .all_candidates(key)
                .into_iter()
                .map(|id| Step::Invoke {
                    descriptor: descriptor.clone(),
                    id,
                    weak: !registry.is_strong(id, &descriptor),
                    keep: Keep::Objects(Some(*key)),
                    path: path.clone(),
                })
                .collect(),
            TypeDescriptor::Optional(inner) => vec![Step::Expand((**inner).clone(), path)],
            TypeDescriptor::Union(arms) => arms
                .iter()
                .enumerate()
                .map(|(index, arm)| {
                    let mut path = path.clone();
                    path.push(index);
                    Step::Expand(arm.clone(), path)
                })
                .collect(),
            TypeDescriptor::ListOf(_) | TypeDescriptor::IterableOf(_) => {
                vec![Step::Resolve(descriptor.clone(), path)]
            }
            TypeDescriptor::TupleOf(_) => {
                let exact = registry.strong(&descriptor);
                if exact.is_empty() {
                    vec![Step::Resolve(descriptor.clone(), path)]
                } else {
                    exact
                        .iter()
                        .map(|&id| Step::Invoke {
                            descriptor: descriptor.clone(),
                            id,
                            weak: false,
                            keep: Keep::Whole,
                            path: path.clone(),
                        })
                        .collect()
                }
            }
            TypeDescriptor::Any => registry
                .providers()
                .map(|(id, _)| Step::Invoke {
                    descriptor: TypeDescriptor::Any,
                    id,
                    weak: true,
                    keep: Keep::Objects(None),
                    path: path.clone(),
                })
                .collect(),
            TypeDescriptor::MetaTypeOf(inner) => {
                let exact = registry.strong(&descriptor).iter().map(|&id| Step::Invoke {
                    descriptor: descriptor.clone(),
                    id,
                    weak: false,
                    keep: Keep::Whole,
                    path: path.clone(),
                });
                let classes = inner
                    .as_concrete()
                    .map(|key| resolver.class_keys(&key))
                    .unwrap_or_default()
                    .into_iter()
                    .map(|class| Step::Emit(Value::Type(class), path.clone()));
                exact.chain(classes).collect()
            }
        };

        for step in steps.into_iter().rev() {
            self.plan.push_front(step);
        }
    }
}

/// Wrap `value` in the union variants it was reached through.
fn tag(value: Value, path: &[usize]) -> Value {
    path.iter()
        .rev()
        .fold(value, |value, &index| Value::Variant(index, Box::new(value)))
}
