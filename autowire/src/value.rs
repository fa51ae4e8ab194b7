//! Type-erased resolution results.
//!
//! [`Value`] is what the resolver returns for a [`TypeDescriptor`](crate::descriptor::TypeDescriptor)
//! query, and what providers hand back to it. The typed front end
//! ([`Query`](crate::query::Query)) converts values into Rust types.

use std::fmt;

use crate::descriptor::TypeKey;
use crate::instance::Object;
use crate::runtime::{Shared, Store};

#[derive(Clone, Debug)]
pub enum Value {
    /// No value: an unresolved `Optional`, or a factory that produced `None`.
    Absent,
    Object(Object),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    /// A lazy single-pass sequence produced by a factory.
    Seq(Sequence),
    /// The arm of a `Union` query that produced the inner value.
    Variant(usize, Box<Value>),
    /// A type object, answer to a `MetaTypeOf` query.
    Type(TypeKey),
}

impl Value {
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn into_object(self) -> Option<Object> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    /// Every object reachable from this value, depth first, lazily.
    pub fn objects(self) -> Flatten {
        Flatten::new(self)
    }

    /// Short description for error messages.
    pub(crate) fn shape(&self) -> &'static str {
        match self {
            Value::Absent => "an absent value",
            Value::Object(_) => "an object",
            Value::List(_) => "a list",
            Value::Tuple(_) => "a tuple",
            Value::Seq(_) => "a sequence",
            Value::Variant(..) => "a union variant",
            Value::Type(_) => "a type object",
        }
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        Value::Object(object)
    }
}

struct SequenceState {
    pulled: Vec<Value>,
    source: Option<Box<dyn Iterator<Item = Value>>>,
}

/// A single-pass source with a memoized prefix.
///
/// The underlying iterator is pulled only as far as some reader needs. Clones
/// share the memo, so a sequence cached for the rest of a resolution call can
/// be read again without re-running the factory or re-pulling the source.
#[derive(Clone)]
pub struct Sequence {
    state: Shared<Store<SequenceState>>,
}

impl Sequence {
    pub fn new(source: impl Iterator<Item = Value> + 'static) -> Self {
        Self {
            state: Shared::new(Store::new(SequenceState {
                pulled: Vec::new(),
                source: Some(Box::new(source)),
            })),
        }
    }

    /// The element at `index`, pulling the source up to it if needed.
    pub fn get(&self, index: usize) -> Option<Value> {
        let mut state = self.state.borrow_mut();
        while state.pulled.len() <= index {
            let next = state.source.as_mut()?.next();
            match next {
                Some(value) => state.pulled.push(value),
                None => {
                    state.source = None;
                    return None;
                }
            }
        }
        Some(state.pulled[index].clone())
    }

    /// How many elements have been pulled so far.
    pub fn pulled(&self) -> usize {
        self.state.borrow().pulled.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.state.borrow().source.is_none()
    }

    pub fn iter(&self) -> SequenceIter {
        SequenceIter {
            sequence: self.clone(),
            index: 0,
        }
    }
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequence")
            .field("pulled", &self.pulled())
            .field("exhausted", &self.is_exhausted())
            .finish()
    }
}

pub struct SequenceIter {
    sequence: Sequence,
    index: usize,
}

impl Iterator for SequenceIter {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        let value = self.sequence.get(self.index)?;
        self.index += 1;
        Some(value)
    }
}

enum Cursor {
    Items(std::vec::IntoIter<Value>),
    Seq(SequenceIter),
}

/// Depth-first walk over the objects of a value.
///
/// Lists, tuples, sequences and union variants are entered; absent values and
/// type objects are skipped. Sequences are pulled only as far as the walk goes.
pub struct Flatten {
    stack: Vec<Cursor>,
}

impl Flatten {
    pub fn new(value: Value) -> Self {
        Self {
            stack: vec![Cursor::Items(vec![value].into_iter())],
        }
    }
}

impl Iterator for Flatten {
    type Item = Object;

    fn next(&mut self) -> Option<Object> {
        loop {
            let next = match self.stack.last_mut()? {
                Cursor::Items(items) => items.next(),
                Cursor::Seq(iter) => iter.next(),
            };
            match next {
                None => {
                    self.stack.pop();
                }
                Some(Value::Object(object)) => return Some(object),
                Some(Value::List(items)) | Some(Value::Tuple(items)) => {
                    self.stack.push(Cursor::Items(items.into_iter()))
                }
                Some(Value::Seq(sequence)) => self.stack.push(Cursor::Seq(sequence.iter())),
                Some(Value::Variant(_, inner)) => {
                    self.stack.push(Cursor::Items(vec![*inner].into_iter()))
                }
                Some(Value::Absent) | Some(Value::Type(_)) => {}
            }
        }
    }
}
