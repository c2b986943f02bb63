//! PostgreSQL adapters.
//!
//! Concrete implementations of the persistence ports backed by sqlx.

mod course_catalog;
mod invoice_repository;
mod subscription_repository;
mod webhook_event_store;

pub use course_catalog::PostgresCourseCatalog;
pub use invoice_repository::PostgresInvoiceRepository;
pub use subscription_repository::PostgresSubscriptionRepository;
pub use webhook_event_store::PostgresWebhookEventStore;
