//! In-memory adapters for tests and local development.
//!
//! Each mirrors the behavioral contract of its Postgres counterpart,
//! including atomic claim semantics and optimistic version checks, so
//! pipeline tests exercise the real invariants without a database.

mod course_catalog;
mod invoice_repository;
mod subscription_repository;
mod webhook_event_store;

pub use course_catalog::InMemoryCourseCatalog;
pub use invoice_repository::InMemoryInvoiceRepository;
pub use subscription_repository::InMemorySubscriptionRepository;
pub use webhook_event_store::InMemoryWebhookEventStore;
