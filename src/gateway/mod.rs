//! Remote data gateway for the hosted backend.
//!
//! The board never talks HTTP directly: everything goes through the
//! [`Gateway`] repository trait, which is implemented by [`RestGateway`] for
//! a PostgREST (Supabase) project and mocked in tests.
//!
//! # Modules
//!
//! - `requester` - The [`Gateway`] trait and its REST implementation
//! - `rows` - Filters, change notifications and wire-only rows
//!
//! # Examples
//!
//! ```no_run
//! use minbar::gateway::{DayFilter, Gateway, RestGateway};
//!
//! let gateway = RestGateway::new("https://project.supabase.co", "anon-key", None, timeout)?;
//! let mut changes = gateway.changes();
//! let days = gateway.list_days(DayFilter::All).await?;
//! ```

mod requester;
mod rows;

#[cfg(test)]
pub use crate::gateway::requester::MockGateway;
pub use crate::gateway::requester::{Gateway, RestGateway};
pub use crate::gateway::rows::{DayFilter, Profile, RowChange};
