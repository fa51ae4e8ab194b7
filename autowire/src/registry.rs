//! Provider registry and candidate indexes.
//!
//! Providers are kept in registration order; a provider's [`ProviderId`] is
//! its position. On top of that list the registry maintains three indexes:
//!
//! - **strong**: descriptor to providers whose declared output is exactly that
//!   descriptor, or a concrete class that was declared a subtype of it;
//! - **weak**: concrete key to providers whose declared output is broader
//!   (`Optional`, `Union`, `List`, `Iterable`, tuple elements) but may contain
//!   an instance of the key;
//! - **any**: providers whose declared output involves `Any`, which may
//!   contain anything at all.
//!
//! Weak candidates only have a chance of matching; the resolver checks their
//! actual output at run time.

use std::collections::{HashMap, HashSet};

use crate::descriptor::{Specificity, TypeDescriptor, TypeKey};
use crate::error::Error;
use crate::hierarchy::Hierarchy;
use crate::provider::{Provider, ProviderId};
use crate::runtime::Shared;

#[cfg(feature = "tracing")]
use tracing::debug;

pub struct ProviderRegistry {
    providers: Vec<Provider>,
    strong: HashMap<TypeDescriptor, Vec<ProviderId>>,
    weak: HashMap<TypeKey, Vec<ProviderId>>,
    any: Vec<ProviderId>,
    hierarchy: Shared<Hierarchy>,
}

impl ProviderRegistry {
    pub fn new(hierarchy: Shared<Hierarchy>) -> Self {
        Self {
            providers: Vec::new(),
            strong: HashMap::new(),
            weak: HashMap::new(),
            any: Vec::new(),
            hierarchy,
        }
    }

    pub fn hierarchy(&self) -> &Shared<Hierarchy> {
        &self.hierarchy
    }

    /// Validate, assign the next id, and index the provider.
    ///
    /// A provider that fails validation leaves the registry untouched.
    pub fn register(&mut self, provider: Provider) -> Result<ProviderId, Error> {
        provider.validate()?;

        let id = ProviderId::new(self.providers.len());

        #[cfg(feature = "tracing")]
        debug!(
            "Registering {:?} {} as {} producing {}",
            provider.kind, provider.name, id, provider.produces
        );

        self.providers.push(provider);
        self.index(id);
        Ok(id)
    }

    pub fn get(&self, id: ProviderId) -> &Provider {
        &self.providers[id.index()]
    }

    pub fn providers(&self) -> impl Iterator<Item = (ProviderId, &Provider)> {
        self.providers
            .iter()
            .enumerate()
            .map(|(index, provider)| (ProviderId::new(index), provider))
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Descriptors a provider is a strong candidate for.
    ///
    /// For a concrete class that is the class and every declared supertype.
    pub fn produced_types(&self, id: ProviderId) -> Vec<TypeDescriptor> {
        let produces = &self.get(id).produces;
        match produces {
            TypeDescriptor::Concrete(key) => std::iter::once(*key)
                .chain(self.hierarchy.supertypes_of(key))
                .map(TypeDescriptor::Concrete)
                .collect(),
            TypeDescriptor::TupleOf(_) | TypeDescriptor::MetaTypeOf(_) => vec![produces.clone()],
            _ => Vec::new(),
        }
    }

    /// Strong candidates in registration order.
    pub fn strong(&self, descriptor: &TypeDescriptor) -> &[ProviderId] {
        self.strong
            .get(descriptor)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_strong(&self, id: ProviderId, descriptor: &TypeDescriptor) -> bool {
        self.strong(descriptor).contains(&id)
    }

    /// Weak candidates for `key`, most specific output first, then by
    /// registration order. Providers of `Any` come last.
    pub fn weak(&self, key: &TypeKey) -> Vec<ProviderId> {
        let mut candidates: Vec<ProviderId> = self
            .weak
            .get(key)
            .into_iter()
            .flatten()
            .chain(self.any.iter())
            .copied()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        candidates.sort_by_key(|id| (self.rank(*id), *id));
        candidates
    }

    /// Every provider that may yield an instance of `key`, strong or weak, in
    /// registration order.
    pub fn all_candidates(&self, key: &TypeKey) -> Vec<ProviderId> {
        let mut candidates: Vec<ProviderId> = self
            .strong(&TypeDescriptor::Concrete(*key))
            .iter()
            .copied()
            .chain(self.weak(key))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        candidates.sort();
        candidates
    }

    /// Whether some registered provider could answer `descriptor`.
    ///
    /// Shapes that never fail (`Optional`, `List`, `Iterable`) are always
    /// covered. Nothing is constructed.
    pub fn covers(&self, descriptor: &TypeDescriptor) -> bool {
        match descriptor {
            TypeDescriptor::Concrete(key) => {
                !self.strong(descriptor).is_empty() || !self.weak(key).is_empty()
            }
            TypeDescriptor::Optional(_)
            | TypeDescriptor::ListOf(_)
            | TypeDescriptor::IterableOf(_) => true,
            TypeDescriptor::Union(arms) => arms.iter().any(|arm| self.covers(arm)),
            TypeDescriptor::TupleOf(elements) => {
                !self.strong(descriptor).is_empty()
                    || elements.iter().all(|element| self.covers(element))
            }
            TypeDescriptor::Any => !self.is_empty(),
            TypeDescriptor::MetaTypeOf(inner) => {
                !self.strong(descriptor).is_empty()
                    || self
                        .strong(inner)
                        .iter()
                        .any(|id| self.get(*id).class.is_some())
            }
        }
    }

    /// Rebuild every index, after the class hierarchy changed.
    pub fn reindex(&mut self) {
        #[cfg(feature = "tracing")]
        debug!("Reindexing {} providers", self.providers.len());

        self.strong.clear();
        self.weak.clear();
        self.any.clear();
        for index in 0..self.providers.len() {
            self.index(ProviderId::new(index));
        }
    }

    fn rank(&self, id: ProviderId) -> Specificity {
        if self.any.contains(&id) {
            Specificity::Any
        } else {
            self.get(id).produces.specificity()
        }
    }

    fn index(&mut self, id: ProviderId) {
        for descriptor in self.produced_types(id) {
            self.strong.entry(descriptor).or_default().push(id);
        }

        let produces = self.get(id).produces.clone();
        let mut keys = Vec::new();
        let mut any = false;
        match &produces {
            TypeDescriptor::Concrete(_) | TypeDescriptor::MetaTypeOf(_) => {}
            other => collect_cores(other, &mut keys, &mut any),
        }

        if any {
            self.any.push(id);
        }

        let mut seen = HashSet::new();
        for key in keys {
            for key in std::iter::once(key).chain(self.hierarchy.supertypes_of(&key)) {
                if seen.insert(key) {
                    self.weak.entry(key).or_default().push(id);
                }
            }
        }
    }
}

/// Concrete leaves a broad output could contain, and whether it involves `Any`.
fn collect_cores(descriptor: &TypeDescriptor, keys: &mut Vec<TypeKey>, any: &mut bool) {
    match descriptor {
        TypeDescriptor::Concrete(key) => keys.push(*key),
        TypeDescriptor::Any => *any = true,
        TypeDescriptor::Optional(inner)
        | TypeDescriptor::ListOf(inner)
        | TypeDescriptor::IterableOf(inner) => collect_cores(inner, keys, any),
        TypeDescriptor::Union(items) | TypeDescriptor::TupleOf(items) => {
            for item in items {
                collect_cores(item, keys, any);
            }
        }
        // A type object is never an instance.
        TypeDescriptor::MetaTypeOf(_) => {}
    }
}
