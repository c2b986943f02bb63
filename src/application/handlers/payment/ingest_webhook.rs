//! IngestWebhookHandler - the webhook ingestion pipeline.
//!
//! One entry point for live deliveries (`handle`, signature verified)
//! and a second for replays and reconciliation (`process_delivery`,
//! signature already validated at capture time). Both converge on the
//! same store-claim-settle-activate sequence, so every path through the
//! system exercises the same idempotency machinery.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::billing::{
    AmountMismatchFlagged, GatewayEventType, GatewayNotification, GatewayWebhookVerifier, Invoice,
    InvoicePaid, InvoicePartiallyPaid, InvoiceStatus, PaymentFailed, ProcessingStatus, Settlement,
    WebhookError, WebhookEvent,
};
use crate::domain::foundation::{
    CurrencyCode, EventId, Money, OrderId, SerializableDomainEvent, Timestamp,
};
use crate::ports::{
    ClaimOutcome, EventPublisher, InvoiceRepository, ReviewNote, WebhookEventStore,
};

use super::activate_order::{ActivateOrderCommand, ActivateOrderHandler, ActivationOutcome};

/// Command carrying one raw webhook request.
#[derive(Debug, Clone)]
pub struct IngestWebhookCommand {
    /// Raw request body, byte-exact.
    pub payload: Vec<u8>,
    /// X-Gateway-Signature header value.
    pub signature: String,
    /// Captured request headers, stored alongside the payload.
    pub headers: HashMap<String, String>,
}

/// What the pipeline did with a delivery.
///
/// Every variant is acknowledged with 200; failures that should make the
/// gateway retry surface as `Err` from the handler instead.
#[derive(Debug, Clone)]
pub enum IngestOutcome {
    /// The delivery was processed to completion.
    Processed {
        order_id: OrderId,
        new_status: InvoiceStatus,
        activation: Option<ActivationOutcome>,
    },
    /// The delivery was a duplicate of one already handled or in flight.
    Duplicate {
        replay_count: i64,
        prior_status: ProcessingStatus,
    },
    /// Event type we do not handle; recorded and acknowledged for
    /// forward compatibility.
    IgnoredUnknownType { event_type: String },
    /// The invoice was already terminal; the event was absorbed.
    LateEvent { status: InvoiceStatus },
    /// Processing failed; the failure is captured on the stored record.
    Failed { error: String },
}

/// Handler implementing the full ingestion pipeline.
pub struct IngestWebhookHandler {
    verifier: GatewayWebhookVerifier,
    event_store: Arc<dyn WebhookEventStore>,
    invoices: Arc<dyn InvoiceRepository>,
    activation: Arc<ActivateOrderHandler>,
    event_publisher: Arc<dyn EventPublisher>,
    /// Allowed reconciliation slack in minor units.
    amount_tolerance_minor: i64,
    /// How long a PROCESSING owner may be silent before a re-attempt may
    /// adopt its event.
    stale_grace_secs: u64,
}

impl IngestWebhookHandler {
    pub fn new(
        verifier: GatewayWebhookVerifier,
        event_store: Arc<dyn WebhookEventStore>,
        invoices: Arc<dyn InvoiceRepository>,
        activation: Arc<ActivateOrderHandler>,
        event_publisher: Arc<dyn EventPublisher>,
        amount_tolerance_minor: i64,
        stale_grace_secs: u64,
    ) -> Self {
        Self {
            verifier,
            event_store,
            invoices,
            activation,
            event_publisher,
            amount_tolerance_minor,
            stale_grace_secs,
        }
    }

    /// Live path: verify the signature, then run the shared pipeline.
    ///
    /// # Errors
    ///
    /// Signature-class errors (`InvalidSignature`, `TimestampOutOfRange`,
    /// `InvalidTimestamp`) and `ParseError` mean nothing was stored.
    /// `Database` errors before the claim landed mean the gateway should
    /// redeliver.
    pub async fn handle(&self, cmd: IngestWebhookCommand) -> Result<IngestOutcome, WebhookError> {
        let notification = self.verifier.verify_and_parse(&cmd.payload, &cmd.signature)?;
        self.process_delivery(notification, cmd.payload, cmd.headers)
            .await
    }

    /// Shared pipeline: store, claim, settle, activate.
    ///
    /// Replay and the reconciler enter here with a notification rebuilt
    /// from stored bytes; the claim increments the replay count and the
    /// ownership CAS decides whether this caller actually processes.
    pub async fn process_delivery(
        &self,
        notification: GatewayNotification,
        raw_payload: Vec<u8>,
        raw_headers: HashMap<String, String>,
    ) -> Result<IngestOutcome, WebhookError> {
        let order_id = OrderId::new(notification.order_id.trim())
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;
        let event_id = EventId::from_string(notification.idempotency_key());

        // 1. Durable record first. Everything after this point is
        // replayable; everything before it must make the gateway retry.
        let event = WebhookEvent::received(
            event_id.clone(),
            order_id,
            notification.event_type.trim(),
            raw_payload,
            raw_headers,
        );
        let claim = self
            .event_store
            .record_and_claim(event)
            .await
            .map_err(|e| WebhookError::Database(e.to_string()))?;

        // 2. Duplicate discipline. A PROCESSED prior means the work is
        // done; everything else defers to the ownership CAS, which is
        // what actually decides under concurrency.
        let (replay_count, prior_status) = match claim {
            ClaimOutcome::Claimed => (1, ProcessingStatus::Stored),
            ClaimOutcome::Duplicate {
                replay_count,
                prior_status,
            } => {
                if prior_status == ProcessingStatus::Processed {
                    debug!(
                        event_id = %event_id,
                        replay_count,
                        "Duplicate of a processed event, short-circuiting"
                    );
                    return Ok(IngestOutcome::Duplicate {
                        replay_count,
                        prior_status,
                    });
                }
                (replay_count, prior_status)
            }
        };

        // 3. Take ownership. Loses against a fresh concurrent owner.
        let stale_before = Timestamp::now().minus_secs(self.stale_grace_secs);
        let owned = self
            .event_store
            .begin_processing(&event_id, stale_before)
            .await
            .map_err(|e| WebhookError::Database(e.to_string()))?;
        if !owned {
            debug!(event_id = %event_id, "Another worker owns this event");
            return Ok(IngestOutcome::Duplicate {
                replay_count,
                prior_status,
            });
        }

        // 4. Settle. Outcomes are captured on the record; only the claim
        // path above may bubble errors to the transport.
        match self.settle(&notification).await {
            Ok(outcome) => {
                self.event_store
                    .mark_processed(&event_id)
                    .await
                    .map_err(|e| WebhookError::Database(e.to_string()))?;
                Ok(outcome)
            }
            Err(err) => {
                warn!(event_id = %event_id, error = %err, "Delivery processing failed");
                self.event_store
                    .mark_failed(&event_id, &err.to_string())
                    .await
                    .map_err(|e| WebhookError::Database(e.to_string()))?;
                Ok(IngestOutcome::Failed {
                    error: err.to_string(),
                })
            }
        }
    }

    /// Applies the notification to the invoice and, when the full total
    /// settled, runs activation.
    async fn settle(
        &self,
        notification: &GatewayNotification,
    ) -> Result<IngestOutcome, WebhookError> {
        let event_type = notification.parsed_type();
        if event_type == GatewayEventType::Unknown {
            info!(
                event_type = %notification.event_type,
                order_id = %notification.order_id,
                "Unknown gateway event type, recording as no-op"
            );
            return Ok(IngestOutcome::IgnoredUnknownType {
                event_type: notification.event_type.clone(),
            });
        }

        let order_id = OrderId::new(notification.order_id.trim())
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;
        let mut invoice = self
            .invoices
            .find_by_order_id(&order_id)
            .await
            .map_err(|e| WebhookError::Database(e.to_string()))?
            .ok_or_else(|| WebhookError::InvoiceNotFound(order_id.to_string()))?;

        let amount = self.settlement_amount(notification, &invoice)?;

        let settlement =
            match invoice.apply_settlement(event_type, amount.as_ref(), self.amount_tolerance_minor)
            {
                Ok(settlement) => settlement,
                Err(WebhookError::AmountMismatch {
                    expected_minor,
                    actual_minor,
                }) => {
                    self.flag_amount_mismatch(&invoice, expected_minor, actual_minor)
                        .await?;
                    return Err(WebhookError::AmountMismatch {
                        expected_minor,
                        actual_minor,
                    });
                }
                Err(err) => return Err(err),
            };

        match settlement {
            Settlement::TerminalNoOp { status } => {
                // A settlement replayed against a PAID invoice may be the
                // retry of a delivery whose activation failed after the
                // payment landed (lock timeout, crash mid-activation).
                // Activation is idempotent under the lock, so re-run it to
                // heal a missing grant before absorbing the event.
                if status == InvoiceStatus::Paid && event_type.is_settlement() {
                    let recovered = self
                        .activation
                        .handle(ActivateOrderCommand {
                            order_id: invoice.order_id.clone(),
                            user_id: invoice.customer_id.clone(),
                            course_id: invoice.course_id,
                        })
                        .await?;
                    if let ActivationOutcome::Activated { subscription_id } = &recovered {
                        info!(
                            order_id = %order_id,
                            subscription_id = %subscription_id,
                            "Recovered missing grant for a paid order"
                        );
                    }
                }

                info!(
                    order_id = %order_id,
                    status = %status,
                    "Late event against terminal invoice absorbed"
                );
                Ok(IngestOutcome::LateEvent { status })
            }
            Settlement::Transitioned {
                new_status,
                activation_required,
            } => {
                self.invoices
                    .update(&invoice)
                    .await
                    .map_err(|e| WebhookError::Database(e.to_string()))?;

                self.publish_settlement_event(&invoice, event_type, new_status)
                    .await?;

                let activation = if activation_required {
                    Some(
                        self.activation
                            .handle(ActivateOrderCommand {
                                order_id: invoice.order_id.clone(),
                                user_id: invoice.customer_id.clone(),
                                course_id: invoice.course_id,
                            })
                            .await?,
                    )
                } else {
                    None
                };

                Ok(IngestOutcome::Processed {
                    order_id,
                    new_status,
                    activation,
                })
            }
        }
    }

    /// Builds the settlement `Money` from the notification, defaulting to
    /// the invoice's currency when the gateway omits one.
    fn settlement_amount(
        &self,
        notification: &GatewayNotification,
        invoice: &Invoice,
    ) -> Result<Option<Money>, WebhookError> {
        let Some(minor) = notification.amount else {
            return Ok(None);
        };
        let currency = match notification.currency.as_deref() {
            Some(code) => CurrencyCode::new(code)
                .map_err(|e| WebhookError::ParseError(e.to_string()))?,
            None => invoice.total_amount.currency().clone(),
        };
        let money =
            Money::new(minor, currency).map_err(|e| WebhookError::ParseError(e.to_string()))?;
        Ok(Some(money))
    }

    /// Routes a non-reconciling amount to the review queue. The invoice
    /// itself was left untouched by `apply_settlement`.
    async fn flag_amount_mismatch(
        &self,
        invoice: &Invoice,
        expected_minor: i64,
        actual_minor: i64,
    ) -> Result<(), WebhookError> {
        warn!(
            order_id = %invoice.order_id,
            expected_minor,
            actual_minor,
            "Settlement amount does not reconcile, flagging for review"
        );

        self.invoices
            .append_review_note(ReviewNote::flag(
                invoice.id,
                invoice.order_id.clone(),
                "AMOUNT_MISMATCH",
                format!(
                    "expected {} minor units, got {}",
                    expected_minor, actual_minor
                ),
            ))
            .await
            .map_err(|e| WebhookError::Database(e.to_string()))?;

        let event = AmountMismatchFlagged {
            event_id: EventId::new(),
            invoice_id: invoice.id,
            order_id: invoice.order_id.clone(),
            expected_minor,
            actual_minor,
            occurred_at: Timestamp::now(),
        };
        self.event_publisher
            .publish(event.to_envelope())
            .await
            .map_err(|e| WebhookError::StorageError(e.to_string()))?;

        Ok(())
    }

    /// Publishes the billing event matching the transition just persisted.
    async fn publish_settlement_event(
        &self,
        invoice: &Invoice,
        event_type: GatewayEventType,
        new_status: InvoiceStatus,
    ) -> Result<(), WebhookError> {
        let envelope = match new_status {
            InvoiceStatus::Paid => InvoicePaid {
                event_id: EventId::new(),
                invoice_id: invoice.id,
                order_id: invoice.order_id.clone(),
                customer_id: invoice.customer_id.clone(),
                course_id: invoice.course_id,
                amount_paid_minor: invoice.amount_paid.amount_minor(),
                currency: invoice.amount_paid.currency().to_string(),
                occurred_at: Timestamp::now(),
            }
            .to_envelope(),
            InvoiceStatus::PartiallyPaid => InvoicePartiallyPaid {
                event_id: EventId::new(),
                invoice_id: invoice.id,
                order_id: invoice.order_id.clone(),
                amount_paid_minor: invoice.amount_paid.amount_minor(),
                outstanding_minor: invoice.outstanding_minor(),
                occurred_at: Timestamp::now(),
            }
            .to_envelope(),
            InvoiceStatus::Failed => PaymentFailed {
                event_id: EventId::new(),
                invoice_id: invoice.id,
                order_id: invoice.order_id.clone(),
                gateway_event_type: event_type.as_str().to_string(),
                occurred_at: Timestamp::now(),
            }
            .to_envelope(),
            // Draft/Pending/Cancelled are not settlement targets.
            _ => return Ok(()),
        };

        self.event_publisher
            .publish(envelope)
            .await
            .map_err(|e| WebhookError::StorageError(e.to_string()))
    }
}
