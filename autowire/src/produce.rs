//! Typed factory outputs.
//!
//! A factory registered with
//! [`register_factory_of`](crate::container::Container::register_factory_of)
//! returns a [`Produce`] type, whose descriptor is the declared output shape
//! of the provider. Broad shapes make the provider a weak candidate for the
//! types they may contain.
//!
//! | Rust type | Declared output |
//! |---|---|
//! | [`Obj<T>`] | `Concrete(T)` |
//! | `Option<P>` | `Optional(P)` |
//! | `Vec<P>` | `List(P)` |
//! | [`Many<P>`] | `Iterable(P)`, pulled lazily |
//! | [`OneOf<A, B>`] | `Union(A, B)` |
//! | `(P1, .., Pn)` | `Tuple(P1, .., Pn)` |
//! | [`Dynamic`] | `Any` |
//! | `Result<P, Error>` | as `P`, the error propagates |

use std::fmt;

use crate::descriptor::TypeDescriptor;
use crate::error::Error;
use crate::hierarchy::Hierarchy;
use crate::query::OneOf;
use crate::runtime::Shared;
use crate::value::{Sequence, Value};

pub trait Produce: Sized + 'static {
    fn descriptor() -> TypeDescriptor;

    fn into_value(self, hierarchy: &Shared<Hierarchy>) -> Result<Value, Error>;
}

/// One instance of `T`.
pub struct Obj<T>(Shared<T>);

impl<T> Obj<T> {
    pub fn new(value: T) -> Self {
        Self(Shared::new(value))
    }
}

impl<T> From<Shared<T>> for Obj<T> {
    fn from(value: Shared<T>) -> Self {
        Self(value)
    }
}

impl<T: 'static> Produce for Obj<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::concrete::<T>()
    }

    fn into_value(self, hierarchy: &Shared<Hierarchy>) -> Result<Value, Error> {
        Ok(Value::Object(hierarchy.object(self.0)))
    }
}

impl<P: Produce> Produce for Option<P> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::optional(P::descriptor())
    }

    fn into_value(self, hierarchy: &Shared<Hierarchy>) -> Result<Value, Error> {
        match self {
            Some(inner) => inner.into_value(hierarchy),
            None => Ok(Value::Absent),
        }
    }
}

impl<P: Produce> Produce for Vec<P> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::list_of(P::descriptor())
    }

    fn into_value(self, hierarchy: &Shared<Hierarchy>) -> Result<Value, Error> {
        self.into_iter()
            .map(|item| item.into_value(hierarchy))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List)
    }
}

/// A single-pass, lazily pulled sequence of products.
///
/// Items are converted only when a reader reaches them. An item that fails to
/// convert ends the sequence.
pub struct Many<P> {
    source: Box<dyn Iterator<Item = P>>,
}

impl<P> Many<P> {
    pub fn new(source: impl IntoIterator<Item = P, IntoIter: 'static>) -> Self {
        Self {
            source: Box::new(source.into_iter()),
        }
    }
}

impl<P> fmt::Debug for Many<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Many").finish_non_exhaustive()
    }
}

impl<P: Produce> Produce for Many<P> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::iterable_of(P::descriptor())
    }

    fn into_value(self, hierarchy: &Shared<Hierarchy>) -> Result<Value, Error> {
        let hierarchy = hierarchy.clone();
        let items = self
            .source
            .map_while(move |item| item.into_value(&hierarchy).ok());
        Ok(Value::Seq(Sequence::new(items)))
    }
}

impl<A: Produce, B: Produce> Produce for OneOf<A, B> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::union(vec![A::descriptor(), B::descriptor()])
    }

    fn into_value(self, hierarchy: &Shared<Hierarchy>) -> Result<Value, Error> {
        Ok(match self {
            OneOf::First(a) => Value::Variant(0, Box::new(a.into_value(hierarchy)?)),
            OneOf::Second(b) => Value::Variant(1, Box::new(b.into_value(hierarchy)?)),
        })
    }
}

impl<P: Produce> Produce for Result<P, Error> {
    fn descriptor() -> TypeDescriptor {
        P::descriptor()
    }

    fn into_value(self, hierarchy: &Shared<Hierarchy>) -> Result<Value, Error> {
        self?.into_value(hierarchy)
    }
}

/// Anything at all, decided at run time.
pub struct Dynamic {
    make: Box<dyn FnOnce(&Shared<Hierarchy>) -> Value>,
}

impl Dynamic {
    pub fn new<T: 'static>(value: T) -> Self {
        Self {
            make: Box::new(move |hierarchy| Value::Object(hierarchy.object(Shared::new(value)))),
        }
    }

    pub fn none() -> Self {
        Self {
            make: Box::new(|_| Value::Absent),
        }
    }

    /// Wrap an already built value.
    pub fn value(value: Value) -> Self {
        Self {
            make: Box::new(move |_| value),
        }
    }
}

impl Produce for Dynamic {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Any
    }

    fn into_value(self, hierarchy: &Shared<Hierarchy>) -> Result<Value, Error> {
        Ok((self.make)(hierarchy))
    }
}

macro_rules! impl_produce_for_tuple {
    ($($name:ident $var:ident),+) => {
        impl<$($name: Produce),+> Produce for ($($name,)+) {
            fn descriptor() -> TypeDescriptor {
                TypeDescriptor::tuple_of(vec![$($name::descriptor()),+])
            }

            fn into_value(self, hierarchy: &Shared<Hierarchy>) -> Result<Value, Error> {
                let ($($var,)+) = self;
                Ok(Value::Tuple(vec![$($var.into_value(hierarchy)?),+]))
            }
        }
    };
}

impl_produce_for_tuple!(P1 p1);
impl_produce_for_tuple!(P1 p1, P2 p2);
impl_produce_for_tuple!(P1 p1, P2 p2, P3 p3);
impl_produce_for_tuple!(P1 p1, P2 p2, P3 p3, P4 p4);
impl_produce_for_tuple!(P1 p1, P2 p2, P3 p3, P4 p4, P5 p5);
impl_produce_for_tuple!(P1 p1, P2 p2, P3 p3, P4 p4, P5 p5, P6 p6);
impl_produce_for_tuple!(P1 p1, P2 p2, P3 p3, P4 p4, P5 p5, P6 p6, P7 p7);
impl_produce_for_tuple!(P1 p1, P2 p2, P3 p3, P4 p4, P5 p5, P6 p6, P7 p7, P8 p8);
