//! Enroll Gate - Payment Webhook Ingestion and Subscription Activation
//!
//! This crate receives signed payment-gateway webhooks, records each
//! delivery exactly once, and activates course subscriptions when an
//! invoice is fully paid.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
