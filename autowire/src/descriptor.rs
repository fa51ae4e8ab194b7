//! Type descriptors: the shape of a query or of a provider's output.
//!
//! A [`TypeDescriptor`] is a small tree. Leaves are concrete types identified
//! by a [`TypeKey`] (which also works for unsized keys such as `dyn Trait`),
//! inner nodes describe how the leaves are combined.
//!
//! ```
//! use autowire::descriptor::TypeDescriptor;
//!
//! struct A;
//! struct B;
//!
//! let query = TypeDescriptor::iterable_of(TypeDescriptor::optional(
//!     TypeDescriptor::list_of(TypeDescriptor::union(vec![
//!         TypeDescriptor::concrete::<A>(),
//!         TypeDescriptor::concrete::<B>(),
//!     ])),
//! ));
//! assert!(query.validate().is_ok());
//! ```

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::Error;

/// Identity of a concrete type.
///
/// Equality and hashing use the `TypeId` only; the name is kept for messages.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// The shape of a requested or produced type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    /// A single instance of a concrete type or of a declared supertype.
    Concrete(TypeKey),
    /// The inner type, or an absent value when it cannot be resolved.
    Optional(Box<TypeDescriptor>),
    /// The first arm that resolves, tried left to right.
    Union(Vec<TypeDescriptor>),
    /// Every instance of the inner type, collected.
    ListOf(Box<TypeDescriptor>),
    /// Every instance of the inner type, as a sequence.
    IterableOf(Box<TypeDescriptor>),
    /// A fixed-arity tuple.
    TupleOf(Vec<TypeDescriptor>),
    /// Anything at all.
    Any,
    /// The type object itself rather than an instance.
    MetaTypeOf(Box<TypeDescriptor>),
}

/// Coarse specificity used to order candidates: lower is more specific.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Specificity {
    Exact,
    Broad,
    Any,
}

impl TypeDescriptor {
    pub fn concrete<T: ?Sized + 'static>() -> Self {
        Self::Concrete(TypeKey::of::<T>())
    }

    pub fn optional(inner: TypeDescriptor) -> Self {
        Self::Optional(Box::new(inner))
    }

    pub fn union(arms: Vec<TypeDescriptor>) -> Self {
        Self::Union(arms)
    }

    pub fn list_of(inner: TypeDescriptor) -> Self {
        Self::ListOf(Box::new(inner))
    }

    pub fn iterable_of(inner: TypeDescriptor) -> Self {
        Self::IterableOf(Box::new(inner))
    }

    pub fn tuple_of(elements: Vec<TypeDescriptor>) -> Self {
        Self::TupleOf(elements)
    }

    pub fn meta_type_of(inner: TypeDescriptor) -> Self {
        Self::MetaTypeOf(Box::new(inner))
    }

    /// The concrete key of a `Concrete` descriptor.
    pub fn as_concrete(&self) -> Option<TypeKey> {
        match self {
            Self::Concrete(key) => Some(*key),
            _ => None,
        }
    }

    pub fn specificity(&self) -> Specificity {
        match self {
            Self::Concrete(_) | Self::TupleOf(_) | Self::MetaTypeOf(_) => Specificity::Exact,
            Self::Optional(_) | Self::Union(_) | Self::ListOf(_) | Self::IterableOf(_) => {
                Specificity::Broad
            }
            Self::Any => Specificity::Any,
        }
    }

    /// Partial order `Concrete < Union < Any`.
    ///
    /// A fixed-arity tuple ranks with concrete types: an exact tuple provider
    /// is preferred over resolving the elements one by one.
    pub fn is_more_specific_than(&self, other: &TypeDescriptor) -> bool {
        self.specificity() < other.specificity()
    }

    /// Check the descriptor against the grammar the resolver supports.
    pub fn validate(&self) -> Result<(), Error> {
        match self {
            Self::Concrete(_) | Self::Any => Ok(()),
            Self::Optional(inner) => {
                if matches!(**inner, Self::Optional(_)) {
                    return Err(Error::unsupported_annotation(
                        &self.to_string(),
                        "nested optionals are ambiguous",
                    ));
                }
                inner.validate()
            }
            Self::Union(arms) => {
                if arms.len() < 2 {
                    return Err(Error::unsupported_annotation(
                        &self.to_string(),
                        "a union needs at least two arms",
                    ));
                }
                arms.iter().try_for_each(TypeDescriptor::validate)
            }
            Self::ListOf(inner) | Self::IterableOf(inner) => inner.validate(),
            Self::TupleOf(elements) => {
                if elements.is_empty() {
                    return Err(Error::unsupported_annotation(
                        &self.to_string(),
                        "a tuple needs at least one element",
                    ));
                }
                elements.iter().try_for_each(TypeDescriptor::validate)
            }
            Self::MetaTypeOf(inner) => match **inner {
                Self::Concrete(_) => Ok(()),
                _ => Err(Error::unsupported_annotation(
                    &self.to_string(),
                    "only concrete types have a type object",
                )),
            },
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[TypeDescriptor], sep: &str) -> fmt::Result {
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Concrete(key) => write!(f, "{}", key),
            Self::Optional(inner) => write!(f, "Optional<{}>", inner),
            Self::Union(arms) => {
                f.write_str("Union<")?;
                write_list(f, arms, " | ")?;
                f.write_str(">")
            }
            Self::ListOf(inner) => write!(f, "List<{}>", inner),
            Self::IterableOf(inner) => write!(f, "Iterable<{}>", inner),
            Self::TupleOf(elements) => {
                f.write_str("Tuple<")?;
                write_list(f, elements, ", ")?;
                f.write_str(">")
            }
            Self::Any => f.write_str("Any"),
            Self::MetaTypeOf(inner) => write!(f, "Type<{}>", inner),
        }
    }
}
