//! Type-erased objects handed around by the resolver.

use std::any::{Any, TypeId};
use std::fmt;

use crate::descriptor::{TypeDescriptor, TypeKey};
use crate::error::Error;
use crate::hierarchy::ViewTable;
use crate::proxy::ProxyCell;
use crate::runtime::Shared;
use crate::value::Value;

/// A realized instance together with the views of its class.
pub struct Instance {
    value: Shared<dyn Any>,
    table: Shared<ViewTable>,
}

impl Instance {
    pub(crate) fn new<C: 'static>(value: Shared<C>, table: Shared<ViewTable>) -> Self {
        Self { value, table }
    }

    /// The concrete class the instance was built as.
    pub fn class(&self) -> TypeKey {
        self.table.class()
    }

    /// Run-time `is-a` check against the class and its declared supertypes.
    pub fn satisfies(&self, key: &TypeKey) -> bool {
        self.table.contains(key)
    }

    /// View the instance as `T`, the class itself or a declared supertype.
    pub fn view<T: ?Sized + 'static>(&self) -> Option<Shared<T>> {
        self.table
            .cast(TypeId::of::<T>(), self.value.clone())?
            .downcast::<Shared<T>>()
            .ok()
            .map(|view| *view)
    }

    fn addr(&self) -> *const () {
        Shared::as_ptr(&self.value) as *const ()
    }
}

#[derive(Clone)]
enum Repr {
    Instance(Shared<Instance>),
    Proxy(Shared<ProxyCell>),
}

/// A resolved object: either a genuine instance or a cycle proxy.
///
/// Once a proxy is bound, every access through it reaches the bound instance.
/// Identity is never shared between the two: [`Object::ptr_eq`] compares the
/// proxy cell, not its target.
#[derive(Clone)]
pub struct Object {
    repr: Repr,
}

impl Object {
    pub(crate) fn from_instance(instance: Instance) -> Self {
        Self {
            repr: Repr::Instance(Shared::new(instance)),
        }
    }

    pub(crate) fn proxy(cell: Shared<ProxyCell>) -> Self {
        Self {
            repr: Repr::Proxy(cell),
        }
    }

    pub fn is_proxy(&self) -> bool {
        matches!(self.repr, Repr::Proxy(_))
    }

    /// The genuine instance, following bound proxies.
    pub fn instance(&self) -> Result<Shared<Instance>, Error> {
        let mut current = self.clone();
        loop {
            match current.repr {
                Repr::Instance(instance) => return Ok(instance),
                Repr::Proxy(cell) => match cell.value()? {
                    Value::Object(target) => current = target,
                    other => {
                        return Err(Error::type_mismatch(
                            "an object",
                            &format!("{:?}", other),
                        ));
                    }
                },
            }
        }
    }

    /// A proxy whose construction has not returned yet.
    pub fn is_pending(&self) -> bool {
        match &self.repr {
            Repr::Proxy(cell) => !cell.is_bound() && !cell.is_failed(),
            Repr::Instance(_) => false,
        }
    }

    /// View the object as `T`.
    pub fn downcast<T: ?Sized + 'static>(&self) -> Result<Shared<T>, Error> {
        let instance = self.instance()?;
        instance
            .view::<T>()
            .ok_or_else(|| Error::type_mismatch(std::any::type_name::<T>(), instance.class().name()))
    }

    /// Run-time `is-a` check.
    ///
    /// An unbound proxy satisfies exactly the type it stands in for.
    pub fn satisfies(&self, key: &TypeKey) -> bool {
        match &self.repr {
            Repr::Instance(instance) => instance.satisfies(key),
            Repr::Proxy(cell) if cell.is_bound() => self
                .instance()
                .is_ok_and(|instance| instance.satisfies(key)),
            Repr::Proxy(cell) => match cell.target() {
                TypeDescriptor::Concrete(target) => target == key,
                TypeDescriptor::Any => true,
                _ => false,
            },
        }
    }

    /// Display name of the class, or of the proxied type.
    pub fn type_name(&self) -> String {
        match &self.repr {
            Repr::Instance(instance) => instance.class().name().to_string(),
            Repr::Proxy(cell) => format!("Proxy<{}>", cell.target()),
        }
    }

    /// Reference identity: same instance, or same proxy cell.
    pub fn ptr_eq(this: &Object, other: &Object) -> bool {
        match (&this.repr, &other.repr) {
            (Repr::Instance(a), Repr::Instance(b)) => a.addr() == b.addr(),
            (Repr::Proxy(a), Repr::Proxy(b)) => Shared::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            Repr::Instance(instance) => f
                .debug_struct("Object")
                .field("class", &instance.class())
                .finish(),
            Repr::Proxy(cell) => f
                .debug_struct("Object")
                .field("proxy", &cell.target())
                .field("bound", &cell.is_bound())
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::hierarchy::Hierarchy;
    use crate::provider::ProviderId;

    #[derive(Debug)]
    struct Counter {
        hits: u32,
    }

    trait Hits {
        fn hits(&self) -> u32;
    }

    impl Hits for Counter {
        fn hits(&self) -> u32 {
            self.hits
        }
    }

    #[test]
    fn downcast_to_class_and_declared_views() {
        let hierarchy = Hierarchy::new();
        hierarchy.declare::<Counter, dyn Hits>(|counter| counter);
        let object = hierarchy.object(Shared::new(Counter { hits: 3 }));

        assert_eq!(object.downcast::<Counter>().unwrap().hits, 3);
        assert_eq!(object.downcast::<dyn Hits>().unwrap().hits(), 3);
        assert_eq!(
            object.downcast::<String>().unwrap_err().kind,
            ErrorKind::TypeMismatch
        );
    }

    #[test]
    fn identity_follows_the_instance() {
        let hierarchy = Hierarchy::new();
        let object = hierarchy.object(Shared::new(Counter { hits: 0 }));
        let clone = object.clone();
        let other = hierarchy.object(Shared::new(Counter { hits: 0 }));

        assert!(Object::ptr_eq(&object, &clone));
        assert!(!Object::ptr_eq(&object, &other));
    }

    #[test]
    fn bound_proxy_delegates_but_keeps_its_own_identity() {
        let hierarchy = Hierarchy::new();
        let genuine = hierarchy.object(Shared::new(Counter { hits: 7 }));
        let cell = Shared::new(ProxyCell::new(
            TypeDescriptor::concrete::<Counter>(),
            ProviderId::new(0),
        ));
        let proxy = Object::proxy(cell.clone());

        assert!(proxy.satisfies(&TypeKey::of::<Counter>()));
        assert_eq!(
            proxy.downcast::<Counter>().unwrap_err().kind,
            ErrorKind::ProxyNotBound
        );

        cell.bind(Value::Object(genuine.clone()));
        assert_eq!(proxy.downcast::<Counter>().unwrap().hits, 7);
        assert!(!Object::ptr_eq(&proxy, &genuine));
        assert!(Shared::ptr_eq(
            &proxy.downcast::<Counter>().unwrap(),
            &genuine.downcast::<Counter>().unwrap()
        ));
    }
}
