//! Permission resolution.
//!
//! Pipeline: frame parameters → URL-derived state (immediate) → fetched
//! permission matrix (when it arrives) → per-view and per-field write checks.
//!
//! Resolution is a pure function of its inputs ([`resolve_permissions`]); the
//! caller re-runs it whenever the role, overrides, requested view or matrix
//! change.

mod identity;
mod matrix;
mod resolver;
mod roles;
mod view;

pub use identity::*;
pub use matrix::*;
pub use resolver::*;
pub use roles::*;
pub use view::*;
