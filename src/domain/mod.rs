//! Domain layer - pure business logic.
//!
//! No I/O lives here: aggregates, value objects, state machines and
//! domain events only. The application layer drives these types through
//! the ports.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, events, errors)
//! - `billing` - Invoice state machine, webhook records, signature verification
//! - `enrollment` - Subscription grants and subject entitlements

pub mod billing;
pub mod enrollment;
pub mod foundation;
