//! Macros for composing a container in one block.
//!
//! - [`bind!`] macro: Shorthand for one registration or declaration.
//! - [`container!`] macro: Build a container from a list of `declare(..)` and `bind(..)` items.
//!
//! Both panic on registration errors: a container that cannot be composed is
//! a programming error.
//!
//! # Example
//! ```
//! use autowire::container;
//! use autowire::query::Handle;
//!
//! trait Clock {
//!     fn now(&self) -> u64;
//! }
//!
//! struct Fixed(u64);
//!
//! impl Clock for Fixed {
//!     fn now(&self) -> u64 {
//!         self.0
//!     }
//! }
//!
//! struct Scheduler {
//!     clock: Handle<dyn Clock>,
//! }
//!
//! let c = container! {
//!     declare(Fixed => dyn Clock)
//!     bind(instance Fixed(42))
//!     bind(class |clock: Handle<dyn Clock>| Scheduler { clock })
//! };
//!
//! assert_eq!(c.resolve::<Handle<Scheduler>>().clock.now(), 42);
//! ```

/// Shorthand for one registration or declaration.
///
/// - `Class => dyn A, dyn B`: declare supertypes of `Class` through unsizing.
/// - `instance value`: register an existing value.
/// - `factory f` / `singleton factory f`: register a factory.
/// - `class f` / `singleton class f`: register a class constructor.
/// - `factory_of f` / `singleton factory_of f`: register a factory with a shaped output.
#[macro_export]
macro_rules! bind {
    // Items of `container!` carry their keyword
    ($container:expr, bind $($rest:tt)*) => {
        $crate::bind!($container, $($rest)*)
    };

    ($container:expr, declare $class:ty => $($supertype:ty),+ $(,)?) => {{
        $(
            $container
                .declare::<$class>()
                .implements::<$supertype>(|value| value)
                .unwrap();
        )+
    }};

    // Register an existing value
    ($container:expr, instance $value:expr) => {{
        $container.register_instance($value).unwrap();
    }};

    ($container:expr, singleton factory_of $factory:expr) => {{
        $container.register_singleton_factory_of($factory).unwrap();
    }};

    ($container:expr, factory_of $factory:expr) => {{
        $container.register_factory_of($factory).unwrap();
    }};

    ($container:expr, singleton factory $factory:expr) => {{
        $container.register_singleton_factory($factory).unwrap();
    }};

    ($container:expr, factory $factory:expr) => {{
        $container.register_factory($factory).unwrap();
    }};

    ($container:expr, singleton class $constructor:expr) => {{
        $container.register_singleton_class($constructor).unwrap();
    }};

    ($container:expr, class $constructor:expr) => {{
        $container.register_class($constructor).unwrap();
    }};
}

/// Compose a container from `declare(..)` and `bind(..)` items, in order.
///
/// # Example
/// ```
/// use autowire::container;
///
/// struct Settings;
///
/// let c = container! {
///     bind(singleton class || Settings)
/// };
/// assert_eq!(c.len(), 1);
/// ```
#[macro_export]
macro_rules! container {
    (
        $(
            $kind:ident ( $($stmt:tt)* )
        )*
    ) => {{
        let container = $crate::container::Container::new();

        $(
            $crate::bind!(container, $kind $($stmt)*);
        )*

        container
    }};
}

#[cfg(test)]
mod tests {
    use crate::produce::Obj;
    use crate::query::Handle;

    trait Shape {
        fn area(&self) -> u32;
    }

    trait Named {
        fn name(&self) -> &str;
    }

    struct Square(u32);

    impl Shape for Square {
        fn area(&self) -> u32 {
            self.0 * self.0
        }
    }

    impl Named for Square {
        fn name(&self) -> &str {
            "square"
        }
    }

    struct Canvas {
        shapes: Vec<Handle<dyn Shape>>,
    }

    struct Palette;

    #[test]
    fn macro_container_and_bind() {
        let c = container! {
            declare(Square => dyn Shape, dyn Named)
            bind(instance Square(2))
            bind(factory || Square(3))
            bind(singleton class |shapes: Vec<Handle<dyn Shape>>| Canvas { shapes })
            bind(singleton factory_of || Some(Obj::new(Palette)))
        };

        assert_eq!(c.len(), 4);
        let canvas = c.resolve::<Handle<Canvas>>();
        let areas: Vec<u32> = canvas.shapes.iter().map(|shape| shape.area()).collect();
        assert_eq!(areas, vec![4, 9]);
        assert_eq!(c.resolve::<Handle<dyn Named>>().name(), "square");
        assert!(c.has::<Handle<Palette>>());
    }

    #[test]
    fn bind_on_existing_container() {
        let c = crate::container::Container::new();
        bind!(c, singleton factory || Palette);
        bind!(c, class || Square(1));
        assert_eq!(c.len(), 2);
    }
}
