//! Bearer token provisioning for the remote store

mod token;

pub use token::{EdgeFunctionTokenSource, IssuedToken, TokenManager, TokenSource};
