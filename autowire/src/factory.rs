//! Functions as constructors.
//!
//! Any `Fn(A1, .., An) -> R` whose arguments are [`Query`] types, for up to
//! eight arguments, is a [`Constructor`]. The argument types declare the
//! provider's parameters, so the registry learns a factory's dependencies
//! from its signature:
//!
//! ```
//! use autowire::container::Container;
//! use autowire::query::Handle;
//!
//! struct Database;
//! struct Repository {
//!     db: Handle<Database>,
//! }
//!
//! let container = Container::new();
//! container.register_singleton_class(|| Database).unwrap();
//! container
//!     .register_class(|db: Handle<Database>| Repository { db })
//!     .unwrap();
//!
//! let repository = container.resolve::<Handle<Repository>>();
//! let db = container.resolve::<Handle<Database>>();
//! assert!(Handle::ptr_eq(&repository.db, &db));
//! ```

use crate::error::Error;
use crate::provider::ParameterSpec;
use crate::query::Query;
use crate::value::Value;

pub trait Constructor<Args>: 'static {
    type Output: 'static;

    /// Parameter specs in declaration order.
    fn parameters() -> Vec<ParameterSpec>;

    /// Extract the typed arguments from resolved values and call.
    fn call(&self, args: Vec<Value>) -> Result<Self::Output, Error>;
}

fn next_arg(args: &mut std::vec::IntoIter<Value>) -> Result<Value, Error> {
    args.next()
        .ok_or_else(|| Error::type_mismatch("another argument", "the end of the argument list"))
}

macro_rules! impl_constructor {
    ($($ty:ident $var:ident),*) => {
        impl<F, R, $($ty,)*> Constructor<($($ty,)*)> for F
        where
            F: Fn($($ty),*) -> R + 'static,
            R: 'static,
            $($ty: Query,)*
        {
            type Output = R;

            fn parameters() -> Vec<ParameterSpec> {
                let specs: Vec<fn(usize) -> ParameterSpec> =
                    vec![$($ty::parameter as fn(usize) -> ParameterSpec),*];
                specs
                    .into_iter()
                    .enumerate()
                    .map(|(index, spec)| spec(index))
                    .collect()
            }

            #[allow(unused_mut, unused_variables)]
            fn call(&self, args: Vec<Value>) -> Result<R, Error> {
                let mut args = args.into_iter();
                $(let $var = $ty::extract(next_arg(&mut args)?)?;)*
                Ok(self($($var),*))
            }
        }
    };
}

impl_constructor!();
impl_constructor!(A1 a1);
impl_constructor!(A1 a1, A2 a2);
impl_constructor!(A1 a1, A2 a2, A3 a3);
impl_constructor!(A1 a1, A2 a2, A3 a3, A4 a4);
impl_constructor!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5);
impl_constructor!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6);
impl_constructor!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7);
impl_constructor!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::TypeDescriptor;
    use crate::error::ErrorKind;
    use crate::hierarchy::Hierarchy;
    use crate::query::{Defaulted, Handle, Variadic};
    use crate::runtime::Shared;

    #[derive(Default)]
    struct Level(u8);
    struct Logger;

    fn parameters_of<Args, F: Constructor<Args>>(_: &F) -> Vec<ParameterSpec> {
        F::parameters()
    }

    fn call_with<Args, F: Constructor<Args>>(constructor: &F, args: Vec<Value>) -> Result<F::Output, Error> {
        constructor.call(args)
    }

    #[test]
    fn parameters_come_from_the_signature() {
        let constructor = |_: Handle<Logger>, _: Option<Handle<Level>>, _: Defaulted<Level>| 1u8;
        let specs = parameters_of(&constructor);

        assert_eq!(specs.len(), 3);
        assert_eq!(specs[0].name, "arg0");
        assert_eq!(specs[0].descriptor, TypeDescriptor::concrete::<Logger>());
        assert_eq!(
            specs[1].descriptor,
            TypeDescriptor::optional(TypeDescriptor::concrete::<Level>())
        );
        assert!(specs[2].has_default());
    }

    #[test]
    fn nullary_constructor() {
        let constructor = || Logger;
        assert!(parameters_of(&constructor).is_empty());
        assert!(call_with(&constructor, vec![]).is_ok());
    }

    #[test]
    fn call_extracts_arguments_in_order() {
        let hierarchy = Hierarchy::new();
        let constructor = |level: Handle<Level>, rest: Variadic<Handle<Level>>| level.0 + rest.len() as u8;
        let args = vec![
            Value::Object(hierarchy.object(Shared::new(Level(3)))),
            Value::List(vec![Value::Object(hierarchy.object(Shared::new(Level(0))))]),
        ];

        assert_eq!(call_with(&constructor, args).unwrap(), 4);
    }

    #[test]
    fn missing_arguments_are_a_mismatch() {
        let constructor = |_: Handle<Logger>| ();
        let err = call_with(&constructor, vec![]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeMismatch);
    }
}
