//! Declared class hierarchy.
//!
//! Rust has no runtime subclass relation, so covariant matching works from an
//! explicit declaration list: "`C` can be viewed as `S`", together with the
//! upcast that performs the view (typically an unsizing coercion to
//! `dyn Trait`).
//!
//! Every concrete class gets one [`ViewTable`], shared by all of its objects.
//! Declarations made after an object was created are therefore visible to it.
//!
//! ```
//! use autowire::hierarchy::Hierarchy;
//! use autowire::descriptor::TypeKey;
//! use std::rc::Rc;
//!
//! trait Greeter {
//!     fn greet(&self) -> String;
//! }
//!
//! struct English;
//!
//! impl Greeter for English {
//!     fn greet(&self) -> String {
//!         "hello".into()
//!     }
//! }
//!
//! let hierarchy = Hierarchy::new();
//! hierarchy.declare::<English, dyn Greeter>(|english| english);
//!
//! assert_eq!(
//!     hierarchy.supertypes_of(&TypeKey::of::<English>()),
//!     vec![TypeKey::of::<dyn Greeter>()]
//! );
//!
//! let object = hierarchy.object(Rc::new(English));
//! let greeter = object.downcast::<dyn Greeter>().unwrap();
//! assert_eq!(greeter.greet(), "hello");
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;

use indexmap::IndexMap;

use crate::descriptor::TypeKey;
use crate::instance::{Instance, Object};
use crate::runtime::{Shared, Store};

#[cfg(feature = "tracing")]
use tracing::debug;

/// Turns the erased instance into a boxed `Shared<S>` for one view `S`.
type Caster = Shared<dyn Fn(Shared<dyn Any>) -> Option<Box<dyn Any>>>;

struct View {
    key: TypeKey,
    cast: Caster,
}

/// The views one concrete class supports, its own type first.
pub struct ViewTable {
    class: TypeKey,
    views: Store<IndexMap<TypeId, View>>,
}

impl ViewTable {
    fn new<C: 'static>() -> Self {
        let mut views = IndexMap::new();
        let cast: Caster = Shared::new(|value: Shared<dyn Any>| {
            value
                .downcast::<C>()
                .ok()
                .map(|concrete| Box::new(concrete) as Box<dyn Any>)
        });
        views.insert(
            TypeId::of::<C>(),
            View {
                key: TypeKey::of::<C>(),
                cast,
            },
        );

        Self {
            class: TypeKey::of::<C>(),
            views: Store::new(views),
        }
    }

    pub fn class(&self) -> TypeKey {
        self.class
    }

    pub fn contains(&self, key: &TypeKey) -> bool {
        self.views.borrow().contains_key(&key.id())
    }

    /// Declared supertypes, in declaration order, without the class itself.
    pub fn supertypes(&self) -> Vec<TypeKey> {
        self.views
            .borrow()
            .values()
            .skip(1)
            .map(|view| view.key)
            .collect()
    }

    pub(crate) fn cast(&self, key: TypeId, value: Shared<dyn Any>) -> Option<Box<dyn Any>> {
        let cast = self.views.borrow().get(&key).map(|view| view.cast.clone())?;
        cast(value)
    }

    fn insert(&self, key: TypeKey, cast: Caster) {
        self.views.borrow_mut().insert(key.id(), View { key, cast });
    }
}

/// Registry of view tables, one per concrete class.
#[derive(Default)]
pub struct Hierarchy {
    tables: Store<HashMap<TypeId, Shared<ViewTable>>>,
}

impl Hierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// The view table of `C`, created with its self view on first use.
    pub fn table<C: 'static>(&self) -> Shared<ViewTable> {
        self.tables
            .borrow_mut()
            .entry(TypeId::of::<C>())
            .or_insert_with(|| Shared::new(ViewTable::new::<C>()))
            .clone()
    }

    /// Record that `C` can be viewed as `S` through `cast`.
    ///
    /// Declaring the same pair twice replaces the earlier upcast.
    pub fn declare<C, S>(&self, cast: impl Fn(Shared<C>) -> Shared<S> + 'static)
    where
        C: 'static,
        S: ?Sized + 'static,
    {
        #[cfg(feature = "tracing")]
        debug!(
            "Declaring {} as a subtype of {}",
            std::any::type_name::<C>(),
            std::any::type_name::<S>()
        );

        let caster: Caster = Shared::new(move |value: Shared<dyn Any>| {
            value
                .downcast::<C>()
                .ok()
                .map(|concrete| Box::new(cast(concrete)) as Box<dyn Any>)
        });
        self.table::<C>().insert(TypeKey::of::<S>(), caster);
    }

    /// Declared supertypes of a concrete class; empty for unknown classes.
    pub fn supertypes_of(&self, key: &TypeKey) -> Vec<TypeKey> {
        self.tables
            .borrow()
            .get(&key.id())
            .map(|table| table.supertypes())
            .unwrap_or_default()
    }

    /// Wrap an instance of `C` as a type-erased object with `C`'s views.
    pub fn object<C: 'static>(&self, value: Shared<C>) -> Object {
        Object::from_instance(Instance::new(value, self.table::<C>()))
    }
}
