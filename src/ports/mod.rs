//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Pipeline Ports
//!
//! - `WebhookEventStore` - Durable, claimable record of gateway deliveries
//! - `InvoiceRepository` - Invoice persistence and review notes
//! - `SubscriptionRepository` - Subscription grant persistence
//! - `CourseCatalog` - Read-only subject lookup for activation and sync
//! - `ProcessingLock` - Per-order mutual exclusion for activation
//!
//! ## Event Ports
//!
//! - `EventPublisher` - Port for publishing domain events
//! - `EventSubscriber` - Port for subscribing to domain events
//! - `EventHandler` - Handler that processes incoming events

mod course_catalog;
mod event_publisher;
mod event_subscriber;
mod invoice_repository;
mod processing_lock;
mod subscription_repository;
mod webhook_event_store;

pub use course_catalog::CourseCatalog;
pub use event_publisher::EventPublisher;
pub use event_subscriber::{EventBus, EventHandler, EventSubscriber};
pub use invoice_repository::{InvoiceRepository, ReviewNote};
pub use processing_lock::{LockError, LockGuard, ProcessingLock};
pub use subscription_repository::{SaveOutcome, SubscriptionRepository};
pub use webhook_event_store::{ClaimOutcome, WebhookEventStore};
