//! Constructor-based dependency resolution.
//!
//! Register instances, factories and class constructors in a
//! [`Container`], then ask it for values by type. Dependencies of
//! constructors are read from their argument types and resolved
//! recursively; generic queries (optional, union, collections, tuples, any,
//! type objects) are described by [`TypeDescriptor`]s.
//!
//! ```
//! use autowire::{Container, Handle};
//!
//! struct Database {
//!     url: String,
//! }
//!
//! struct Users {
//!     db: Handle<Database>,
//! }
//!
//! let container = Container::new();
//! container
//!     .register_singleton_factory(|| Database { url: "sqlite::memory:".into() })
//!     .unwrap();
//! container.register_class(|db: Handle<Database>| Users { db }).unwrap();
//!
//! let users = container.resolve::<Handle<Users>>();
//! assert_eq!(users.db.url, "sqlite::memory:");
//! ```

pub mod cache;
pub mod container;
pub mod descriptor;
pub mod error;
pub mod factory;
pub mod hierarchy;
pub mod instance;
pub mod macros;
pub mod produce;
pub mod provider;
pub mod proxy;
pub mod query;
pub mod registry;
pub mod resolver;
pub mod runtime;
pub mod scope;
pub mod stack;
pub mod value;

pub use cache::*;
pub use container::*;
pub use descriptor::*;
pub use error::*;
pub use factory::*;
pub use hierarchy::*;
pub use instance::*;
pub use produce::*;
pub use provider::*;
pub use proxy::*;
pub use query::*;
pub use registry::*;
pub use resolver::*;
pub use runtime::*;
pub use scope::*;
pub use stack::*;
pub use value::*;
