//! Identity bridge for running the editor inside a host application frame.
//!
//! When embedded, the host passes the user's identity and a bearer credential
//! through URL query parameters. A fresh credential can also be requested from
//! the parent frame through a request/response message pair.

pub mod messages;
pub mod params;

pub use messages::*;
pub use params::*;
