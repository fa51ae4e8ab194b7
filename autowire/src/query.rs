//! Typed queries.
//!
//! A [`Query`] is a Rust type that knows its [`TypeDescriptor`] and how to
//! turn a resolved [`Value`] back into itself. Factory and constructor
//! parameters are queries, and so is the type argument of
//! [`Container::try_resolve`](crate::container::Container::try_resolve).
//!
//! | Rust type | Descriptor |
//! |---|---|
//! | [`Handle<T>`] | `Concrete(T)` |
//! | `Option<Q>` | `Optional(Q)` |
//! | [`OneOf<A, B>`] | `Union(A, B)` |
//! | `Vec<Q>` | `List(Q)` |
//! | [`Iterable<Q>`] | `Iterable(Q)` |
//! | `(Q1, .., Qn)` | `Tuple(Q1, .., Qn)` |
//! | [`Object`] | `Any` |
//! | [`TypeOf<T>`] | `Type(T)` |
//!
//! [`Defaulted<T>`] and [`Variadic<Q>`] only change how a parameter is
//! resolved: the former falls back to `T::default()`, the latter collects
//! every match.

use std::cell::OnceCell;
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;

use crate::descriptor::{TypeDescriptor, TypeKey};
use crate::error::Error;
use crate::instance::Object;
use crate::provider::ParameterSpec;
use crate::runtime::Shared;
use crate::value::Value;

pub trait Query: Sized + 'static {
    fn descriptor() -> TypeDescriptor;

    fn extract(value: Value) -> Result<Self, Error>;

    /// How the query is resolved when it is the `index`-th parameter.
    fn parameter(index: usize) -> ParameterSpec {
        ParameterSpec::new(format!("arg{}", index), Self::descriptor())
    }
}

fn mismatch<Q>(value: &Value) -> Error {
    Error::type_mismatch(std::any::type_name::<Q>(), value.shape())
}

/// A resolved object viewed as `T`.
///
/// The handle may wrap a cycle proxy. A proxy still under construction is
/// accepted as is; a settled one must satisfy `T`. Access through [`Handle::get`] fails
/// with `ProxyNotBound` until the proxy is bound; dereferencing panics
/// instead, the same way [`Container::resolve`](crate::container::Container::resolve)
/// panics where `try_resolve` returns an error.
pub struct Handle<T: ?Sized + 'static> {
    object: Object,
    view: OnceCell<Shared<T>>,
}

impl<T: ?Sized + 'static> Handle<T> {
    pub fn get(&self) -> Result<&T, Error> {
        if let Some(view) = self.view.get() {
            return Ok(&**view);
        }
        let view = self.object.downcast::<T>()?;
        Ok(&**self.view.get_or_init(|| view))
    }

    pub fn shared(&self) -> Result<Shared<T>, Error> {
        self.get()?;
        self.view
            .get()
            .cloned()
            .ok_or_else(|| Error::type_mismatch(std::any::type_name::<T>(), &self.object.type_name()))
    }

    pub fn object(&self) -> &Object {
        &self.object
    }

    pub fn is_proxy(&self) -> bool {
        self.object.is_proxy()
    }

    /// Reference identity of the underlying objects.
    pub fn ptr_eq(this: &Handle<T>, other: &Handle<T>) -> bool {
        Object::ptr_eq(&this.object, &other.object)
    }
}

impl<T: ?Sized + 'static> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self {
            object: self.object.clone(),
            view: self.view.clone(),
        }
    }
}

impl<T: ?Sized + 'static> Deref for Handle<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.get().unwrap_or_else(|err| panic!("{}", err))
    }
}

impl<T: ?Sized + 'static> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handle").field(&self.object).finish()
    }
}

impl<T: ?Sized + 'static> Query for Handle<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::concrete::<T>()
    }

    fn extract(value: Value) -> Result<Self, Error> {
        let object = match value {
            Value::Object(object) => object,
            other => return Err(mismatch::<Self>(&other)),
        };
        if !object.is_pending() && !object.satisfies(&TypeKey::of::<T>()) {
            return Err(Error::type_mismatch(
                std::any::type_name::<T>(),
                &object.type_name(),
            ));
        }
        Ok(Self {
            object,
            view: OnceCell::new(),
        })
    }
}

impl Query for Object {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Any
    }

    fn extract(value: Value) -> Result<Self, Error> {
        match value {
            Value::Object(object) => Ok(object),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl<Q: Query> Query for Option<Q> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::optional(Q::descriptor())
    }

    fn extract(value: Value) -> Result<Self, Error> {
        match value {
            Value::Absent => Ok(None),
            value => Q::extract(value).map(Some),
        }
    }
}

fn items(value: Value) -> Result<Vec<Value>, Error> {
    match value {
        Value::List(items) => Ok(items),
        Value::Seq(sequence) => Ok(sequence.iter().collect()),
        other => Err(Error::type_mismatch("a list", other.shape())),
    }
}

impl<Q: Query> Query for Vec<Q> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::list_of(Q::descriptor())
    }

    fn extract(value: Value) -> Result<Self, Error> {
        items(value)?.into_iter().map(Q::extract).collect()
    }
}

/// Every match of `Q`, consumed as an iterator.
pub struct Iterable<Q> {
    items: std::vec::IntoIter<Q>,
}

impl<Q> Iterator for Iterable<Q> {
    type Item = Q;

    fn next(&mut self) -> Option<Q> {
        self.items.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.items.size_hint()
    }
}

impl<Q> ExactSizeIterator for Iterable<Q> {}

impl<Q: Query> Query for Iterable<Q> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::iterable_of(Q::descriptor())
    }

    fn extract(value: Value) -> Result<Self, Error> {
        Ok(Self {
            items: Vec::<Q>::extract(value)?.into_iter(),
        })
    }
}

/// The first of two alternatives that resolves.
///
/// Longer unions nest: `OneOf<A, OneOf<B, C>>`.
#[derive(Clone, Debug)]
pub enum OneOf<A, B> {
    First(A),
    Second(B),
}

impl<A, B> OneOf<A, B> {
    pub fn first(self) -> Option<A> {
        match self {
            OneOf::First(a) => Some(a),
            OneOf::Second(_) => None,
        }
    }

    pub fn second(self) -> Option<B> {
        match self {
            OneOf::First(_) => None,
            OneOf::Second(b) => Some(b),
        }
    }
}

impl<A: Query, B: Query> Query for OneOf<A, B> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::union(vec![A::descriptor(), B::descriptor()])
    }

    fn extract(value: Value) -> Result<Self, Error> {
        match value {
            Value::Variant(0, inner) => A::extract(*inner).map(OneOf::First),
            Value::Variant(1, inner) => B::extract(*inner).map(OneOf::Second),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

/// The class a type is provided as, without constructing anything.
pub struct TypeOf<T: ?Sized> {
    key: TypeKey,
    _marker: PhantomData<fn(&T)>,
}

impl<T: ?Sized> TypeOf<T> {
    /// The concrete class; for a trait object, the class registered for it.
    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn name(&self) -> &'static str {
        self.key.name()
    }
}

impl<T: ?Sized> Clone for TypeOf<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for TypeOf<T> {}

impl<T: ?Sized> fmt::Debug for TypeOf<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeOf<{}>", self.key)
    }
}

impl<T: ?Sized + 'static> Query for TypeOf<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::meta_type_of(TypeDescriptor::concrete::<T>())
    }

    fn extract(value: Value) -> Result<Self, Error> {
        match value {
            Value::Type(key) => Ok(Self {
                key,
                _marker: PhantomData,
            }),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

/// A `T` that falls back to `T::default()` when it cannot be resolved.
pub struct Defaulted<T: 'static>(pub Handle<T>);

impl<T: 'static> Deref for Defaulted<T> {
    type Target = Handle<T>;

    fn deref(&self) -> &Handle<T> {
        &self.0
    }
}

impl<T: Default + 'static> Query for Defaulted<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::concrete::<T>()
    }

    fn extract(value: Value) -> Result<Self, Error> {
        Handle::extract(value).map(Defaulted)
    }

    fn parameter(index: usize) -> ParameterSpec {
        ParameterSpec::new(format!("arg{}", index), Self::descriptor())
            .with_default(|hierarchy| Value::Object(hierarchy.object(Shared::new(T::default()))))
    }
}

/// Every match of `Q`; never fails, an empty list when nothing matches.
pub struct Variadic<Q>(pub Vec<Q>);

impl<Q> Deref for Variadic<Q> {
    type Target = [Q];

    fn deref(&self) -> &[Q] {
        &self.0
    }
}

impl<Q> IntoIterator for Variadic<Q> {
    type Item = Q;
    type IntoIter = std::vec::IntoIter<Q>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<Q: Query> Query for Variadic<Q> {
    fn descriptor() -> TypeDescriptor {
        Q::descriptor()
    }

    fn extract(value: Value) -> Result<Self, Error> {
        Vec::<Q>::extract(value).map(Variadic)
    }

    fn parameter(index: usize) -> ParameterSpec {
        ParameterSpec::new(format!("arg{}", index), Self::descriptor()).variadic()
    }
}

macro_rules! impl_query_for_tuple {
    ($len:expr; $($name:ident),+) => {
        impl<$($name: Query),+> Query for ($($name,)+) {
            fn descriptor() -> TypeDescriptor {
                TypeDescriptor::tuple_of(vec![$($name::descriptor()),+])
            }

            fn extract(value: Value) -> Result<Self, Error> {
                match value {
                    Value::Tuple(items) if items.len() == $len => {
                        let mut items = items.into_iter();
                        Ok(($($name::extract(items.next().unwrap_or(Value::Absent))?,)+))
                    }
                    other => Err(mismatch::<Self>(&other)),
                }
            }
        }
    };
}

impl_query_for_tuple!(1; Q1);
impl_query_for_tuple!(2; Q1, Q2);
impl_query_for_tuple!(3; Q1, Q2, Q3);
impl_query_for_tuple!(4; Q1, Q2, Q3, Q4);
impl_query_for_tuple!(5; Q1, Q2, Q3, Q4, Q5);
impl_query_for_tuple!(6; Q1, Q2, Q3, Q4, Q5, Q6);
impl_query_for_tuple!(7; Q1, Q2, Q3, Q4, Q5, Q6, Q7);
impl_query_for_tuple!(8; Q1, Q2, Q3, Q4, Q5, Q6, Q7, Q8);
