//! Payment gateway notification types.
//!
//! Defines the structures for parsing gateway webhook payloads.
//! Only fields relevant to our processing are captured.

use serde::{Deserialize, Serialize};

use super::WebhookError;

/// Payment gateway webhook notification (simplified).
///
/// Contains the essential fields needed for webhook processing.
/// Additional fields from the gateway's full schema are ignored.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayNotification {
    /// Raw event type string (e.g. "PAYMENT_SUCCESS").
    #[serde(rename = "eventType")]
    pub event_type: String,

    /// External order identifier this notification settles against.
    #[serde(rename = "orderId")]
    pub order_id: String,

    /// Gateway delivery-attempt identifier, stable across retries of the
    /// same logical event. Absent for gateways that do not send one.
    #[serde(rename = "attemptId", default, skip_serializing_if = "Option::is_none")]
    pub attempt_id: Option<String>,

    /// Settlement amount in minor units. Absent on failure/expiry events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,

    /// ISO-4217 currency code. Gateways may omit it; the invoice's
    /// currency is assumed then.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,

    /// When the gateway recorded the underlying event (Unix seconds).
    #[serde(rename = "occurredAt", default, skip_serializing_if = "Option::is_none")]
    pub occurred_at: Option<i64>,
}

impl GatewayNotification {
    /// Parses a raw webhook body.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` when the JSON is malformed or the order id is
    /// blank - in either case no idempotency key can be derived and the
    /// delivery cannot be stored.
    pub fn parse(raw_body: &[u8]) -> Result<Self, WebhookError> {
        let notification: GatewayNotification = serde_json::from_slice(raw_body)
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;

        if notification.order_id.trim().is_empty() {
            return Err(WebhookError::ParseError("orderId is empty".to_string()));
        }
        if notification.event_type.trim().is_empty() {
            return Err(WebhookError::ParseError("eventType is empty".to_string()));
        }

        Ok(notification)
    }

    /// Deterministic idempotency key for this logical delivery.
    ///
    /// Retries of the same logical event must collide on this key:
    /// `{order_id}:{event_type}:{attempt_id}`, or `{order_id}:{event_type}`
    /// when the gateway supplies no attempt id.
    pub fn idempotency_key(&self) -> String {
        let order_id = self.order_id.trim();
        let event_type = self.event_type.trim();
        match self.attempt_id.as_deref().map(str::trim) {
            Some(attempt_id) if !attempt_id.is_empty() => {
                format!("{}:{}:{}", order_id, event_type, attempt_id)
            }
            _ => format!("{}:{}", order_id, event_type),
        }
    }

    /// Parse the event type into a known enum variant.
    pub fn parsed_type(&self) -> GatewayEventType {
        GatewayEventType::from_str(self.event_type.trim())
    }
}

/// Known gateway event types that we handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayEventType {
    /// Full settlement of the outstanding balance.
    PaymentSuccess,
    /// One installment of a multi-payment plan.
    PartialPayment,
    /// Payment attempt failed.
    PaymentFailure,
    /// Gateway expired the order without settlement.
    OrderExpired,
    /// Unknown or unhandled event type.
    Unknown,
}

impl GatewayEventType {
    /// Parse event type from string.
    pub fn from_str(s: &str) -> Self {
        match s {
            "PAYMENT_SUCCESS" => Self::PaymentSuccess,
            "PARTIAL_PAYMENT" => Self::PartialPayment,
            "PAYMENT_FAILURE" => Self::PaymentFailure,
            "ORDER_EXPIRED" => Self::OrderExpired,
            _ => Self::Unknown,
        }
    }

    /// Convert to the gateway event type string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PaymentSuccess => "PAYMENT_SUCCESS",
            Self::PartialPayment => "PARTIAL_PAYMENT",
            Self::PaymentFailure => "PAYMENT_FAILURE",
            Self::OrderExpired => "ORDER_EXPIRED",
            Self::Unknown => "unknown",
        }
    }

    /// Returns true if this event carries money and must reconcile
    /// against the invoice's outstanding balance.
    pub fn is_settlement(&self) -> bool {
        matches!(self, Self::PaymentSuccess | Self::PartialPayment)
    }
}

/// Builder for creating test GatewayNotification instances.
#[cfg(test)]
pub struct GatewayNotificationBuilder {
    event_type: String,
    order_id: String,
    attempt_id: Option<String>,
    amount: Option<i64>,
    currency: Option<String>,
    occurred_at: Option<i64>,
}

#[cfg(test)]
impl Default for GatewayNotificationBuilder {
    fn default() -> Self {
        Self {
            event_type: "PAYMENT_SUCCESS".to_string(),
            order_id: "ORD-100".to_string(),
            attempt_id: None,
            amount: Some(1000),
            currency: Some("USD".to_string()),
            occurred_at: Some(chrono::Utc::now().timestamp()),
        }
    }
}

#[cfg(test)]
impl GatewayNotificationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = event_type.into();
        self
    }

    pub fn order_id(mut self, order_id: impl Into<String>) -> Self {
        self.order_id = order_id.into();
        self
    }

    pub fn attempt_id(mut self, attempt_id: impl Into<String>) -> Self {
        self.attempt_id = Some(attempt_id.into());
        self
    }

    pub fn amount(mut self, amount: i64) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn no_amount(mut self) -> Self {
        self.amount = None;
        self
    }

    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn occurred_at(mut self, occurred_at: i64) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }

    pub fn build(self) -> GatewayNotification {
        GatewayNotification {
            event_type: self.event_type,
            order_id: self.order_id,
            attempt_id: self.attempt_id,
            amount: self.amount,
            currency: self.currency,
            occurred_at: self.occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ══════════════════════════════════════════════════════════════
    // GatewayNotification Parse Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn parse_minimal_success_notification() {
        let json = br#"{
            "eventType": "PAYMENT_SUCCESS",
            "orderId": "ORD-100",
            "amount": 1000
        }"#;

        let notification = GatewayNotification::parse(json).unwrap();

        assert_eq!(notification.event_type, "PAYMENT_SUCCESS");
        assert_eq!(notification.order_id, "ORD-100");
        assert_eq!(notification.amount, Some(1000));
        assert!(notification.attempt_id.is_none());
        assert!(notification.currency.is_none());
    }

    #[test]
    fn parse_full_notification() {
        let json = br#"{
            "eventType": "PARTIAL_PAYMENT",
            "orderId": "ORD-200",
            "attemptId": "att_7",
            "amount": 300,
            "currency": "USD",
            "occurredAt": 1704067200
        }"#;

        let notification = GatewayNotification::parse(json).unwrap();

        assert_eq!(notification.order_id, "ORD-200");
        assert_eq!(notification.attempt_id.as_deref(), Some("att_7"));
        assert_eq!(notification.currency.as_deref(), Some("USD"));
        assert_eq!(notification.occurred_at, Some(1704067200));
    }

    #[test]
    fn parse_failure_notification_without_amount() {
        let json = br#"{
            "eventType": "PAYMENT_FAILURE",
            "orderId": "ORD-100"
        }"#;

        let notification = GatewayNotification::parse(json).unwrap();
        assert!(notification.amount.is_none());
        assert_eq!(notification.parsed_type(), GatewayEventType::PaymentFailure);
    }

    #[test]
    fn parse_rejects_malformed_json() {
        let result = GatewayNotification::parse(b"{not json");
        assert!(matches!(result, Err(WebhookError::ParseError(_))));
    }

    #[test]
    fn parse_rejects_missing_order_id() {
        let json = br#"{"eventType": "PAYMENT_SUCCESS", "amount": 1000}"#;
        let result = GatewayNotification::parse(json);
        assert!(matches!(result, Err(WebhookError::ParseError(_))));
    }

    #[test]
    fn parse_rejects_blank_order_id() {
        let json = br#"{"eventType": "PAYMENT_SUCCESS", "orderId": "   "}"#;
        let result = GatewayNotification::parse(json);
        assert!(matches!(result, Err(WebhookError::ParseError(_))));
    }

    #[test]
    fn parse_rejects_blank_event_type() {
        let json = br#"{"eventType": "", "orderId": "ORD-100"}"#;
        let result = GatewayNotification::parse(json);
        assert!(matches!(result, Err(WebhookError::ParseError(_))));
    }

    #[test]
    fn serialize_roundtrip() {
        let notification = GatewayNotificationBuilder::new()
            .event_type("ORDER_EXPIRED")
            .order_id("ORD-300")
            .build();

        let json = serde_json::to_vec(&notification).unwrap();
        let parsed = GatewayNotification::parse(&json).unwrap();

        assert_eq!(parsed.event_type, "ORDER_EXPIRED");
        assert_eq!(parsed.order_id, "ORD-300");
    }

    // ══════════════════════════════════════════════════════════════
    // Idempotency Key Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn idempotency_key_without_attempt_id() {
        let notification = GatewayNotificationBuilder::new()
            .order_id("ORD-100")
            .event_type("PAYMENT_SUCCESS")
            .build();

        assert_eq!(notification.idempotency_key(), "ORD-100:PAYMENT_SUCCESS");
    }

    #[test]
    fn idempotency_key_with_attempt_id() {
        let notification = GatewayNotificationBuilder::new()
            .order_id("ORD-100")
            .event_type("PAYMENT_SUCCESS")
            .attempt_id("att_7")
            .build();

        assert_eq!(
            notification.idempotency_key(),
            "ORD-100:PAYMENT_SUCCESS:att_7"
        );
    }

    #[test]
    fn idempotency_key_trims_whitespace() {
        let notification = GatewayNotificationBuilder::new()
            .order_id(" ORD-100 ")
            .event_type(" PAYMENT_SUCCESS ")
            .build();

        assert_eq!(notification.idempotency_key(), "ORD-100:PAYMENT_SUCCESS");
    }

    #[test]
    fn idempotency_key_ignores_blank_attempt_id() {
        let notification = GatewayNotificationBuilder::new()
            .order_id("ORD-100")
            .event_type("PAYMENT_SUCCESS")
            .attempt_id("  ")
            .build();

        assert_eq!(notification.idempotency_key(), "ORD-100:PAYMENT_SUCCESS");
    }

    #[test]
    fn retried_delivery_collides_on_same_key() {
        let first = GatewayNotificationBuilder::new()
            .order_id("ORD-100")
            .attempt_id("att_1")
            .build();
        let retry = GatewayNotificationBuilder::new()
            .order_id("ORD-100")
            .attempt_id("att_1")
            .build();

        assert_eq!(first.idempotency_key(), retry.idempotency_key());
    }

    // ══════════════════════════════════════════════════════════════
    // GatewayEventType Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn event_type_from_str_payment_success() {
        assert_eq!(
            GatewayEventType::from_str("PAYMENT_SUCCESS"),
            GatewayEventType::PaymentSuccess
        );
    }

    #[test]
    fn event_type_from_str_partial_payment() {
        assert_eq!(
            GatewayEventType::from_str("PARTIAL_PAYMENT"),
            GatewayEventType::PartialPayment
        );
    }

    #[test]
    fn event_type_from_str_payment_failure() {
        assert_eq!(
            GatewayEventType::from_str("PAYMENT_FAILURE"),
            GatewayEventType::PaymentFailure
        );
    }

    #[test]
    fn event_type_from_str_order_expired() {
        assert_eq!(
            GatewayEventType::from_str("ORDER_EXPIRED"),
            GatewayEventType::OrderExpired
        );
    }

    #[test]
    fn event_type_from_str_unknown() {
        assert_eq!(
            GatewayEventType::from_str("REFUND_ISSUED"),
            GatewayEventType::Unknown
        );
    }

    #[test]
    fn event_type_as_str_roundtrip() {
        let types = [
            GatewayEventType::PaymentSuccess,
            GatewayEventType::PartialPayment,
            GatewayEventType::PaymentFailure,
            GatewayEventType::OrderExpired,
        ];

        for event_type in types {
            let s = event_type.as_str();
            assert_eq!(GatewayEventType::from_str(s), event_type);
        }
    }

    #[test]
    fn settlement_types_carry_money() {
        assert!(GatewayEventType::PaymentSuccess.is_settlement());
        assert!(GatewayEventType::PartialPayment.is_settlement());
        assert!(!GatewayEventType::PaymentFailure.is_settlement());
        assert!(!GatewayEventType::OrderExpired.is_settlement());
        assert!(!GatewayEventType::Unknown.is_settlement());
    }

    #[test]
    fn parsed_type_returns_correct_variant() {
        let notification = GatewayNotificationBuilder::new()
            .event_type("PAYMENT_FAILURE")
            .build();

        assert_eq!(notification.parsed_type(), GatewayEventType::PaymentFailure);
    }

    #[test]
    fn parsed_type_trims_whitespace() {
        let notification = GatewayNotificationBuilder::new()
            .event_type(" PAYMENT_SUCCESS ")
            .build();

        assert_eq!(notification.parsed_type(), GatewayEventType::PaymentSuccess);
    }
}
