//! Cadence Order - Static execution-order resolution
//!
//! Turns a table of "must run after" declarations into one constant
//! execution rank per participant type:
//! - `TypeCatalog` - explicit participant type hierarchy (base types, subclasses)
//! - `DeclarationTable` - ordering declarations loaded from TOML or built in code
//! - `OrderAssigner` - memoized rank resolver with cycle detection
//! - `ExecutionOrder` - the resolved, immutable type → rank table
//! - `OrderRegistry` - debug diagnostic for unrelated types sharing a rank

mod assigner;
mod catalog;
mod declaration;
mod order;
mod registry;

pub use assigner::OrderAssigner;
pub use catalog::{TypeCatalog, ROOT_PARTICIPANT};
pub use declaration::{DeclarationTable, OrderDeclaration};
pub use order::ExecutionOrder;
pub use registry::{DuplicateRankWarning, OrderRegistry};
