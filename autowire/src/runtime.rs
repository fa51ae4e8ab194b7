//! Runtime type definitions for shared ownership and interior mutability.
//!
//! Resolution is single-threaded and synchronous, so the container is built on
//! `Rc` and `RefCell`. The aliases keep the rest of the crate agnostic of that
//! choice.
//!
//! # Type Aliases
//!
//! - [`Shared<T>`]: Smart pointer for shared ownership
//! - [`Store<T>`]: Container providing interior mutability
//!
//! # Examples
//!
//! ```
//! use autowire::runtime::{Shared, Store};
//!
//! let value = Store::new(42);
//! let shared = Shared::new(value);
//! *shared.borrow_mut() += 1;
//! assert_eq!(*shared.borrow(), 43);
//! ```

use std::{cell::RefCell, rc::Rc};

/// Type alias for shared ownership of resolved instances.
///
/// `Rc<T>` makes every container `!Send` and `!Sync`, which is how the crate
/// states that one container belongs to one thread of resolution.
pub type Shared<T> = Rc<T>;

/// Type alias for interior mutability with runtime borrow checking.
pub type Store<T> = RefCell<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_can_be_cloned() {
        let data = Shared::new(100);
        let clone = Shared::clone(&data);
        assert_eq!(Rc::strong_count(&data), 2);

        drop(clone);
        assert_eq!(Rc::strong_count(&data), 1);
    }

    #[test]
    fn store_allows_mutation() {
        let store = Store::new(42);
        {
            let mut value = store.borrow_mut();
            *value = 100;
        }
        assert_eq!(*store.borrow(), 100);
    }
}
