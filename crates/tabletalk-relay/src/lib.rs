//! tabletalk-relay – the three upstream services behind narrow interfaces.
//!
//! The server only ever talks to:
//! - a [`TokenExchanger`] (OAuth authorization-code grant),
//! - a [`Warehouse`] (run SQL with a bearer token, get [`Row`]s back),
//! - a [`ChatModel`] (send one prompt, get raw text back).
//!
//! Vendor-specific wire formats live in the adapter modules ([`oauth`],
//! [`warehouse`], [`chat`]); swapping a provider means adding an adapter, not
//! touching request handlers.

pub mod chat;
pub mod error;
pub mod oauth;
pub mod prompt;
pub mod provider;
pub mod row;
pub mod warehouse;

pub use error::{RelayError, Result};
pub use prompt::{ChatTurn, GenerationParams, SafetyPolicy};
pub use provider::{AccessToken, ChatModel, TokenExchanger, Warehouse};
pub use row::{FieldList, Row, TableRef};
