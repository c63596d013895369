//! GraphQL endpoint transport
//!
//! This crate posts GraphQL documents to a remote endpoint over HTTP and
//! decodes the `{ data, errors }` envelope. The loader consumes it through the
//! [`GraphQLTransport`] trait so tests can swap in an in-memory endpoint.

pub mod client;
pub mod error;
pub mod introspection;
pub mod response;

pub use crate::client::{GraphQLClient, GraphQLTransport};
pub use crate::error::{GraphQLClientError, Result};
pub use crate::introspection::{INTROSPECTION_QUERY, introspect};
pub use crate::response::{GraphQLError, GraphQLResponse};
