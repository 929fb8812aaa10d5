//! Webhook payloads and the idempotency log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::WebhookError;

/// Webhook log status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[repr(i16)]
pub enum WebhookStatus {
    /// Arrived before its order existed; parked for reconciliation.
    PendingOrder = 0,

    /// Side effects applied (or delegated); the key is burned.
    Processed = 1,
}

impl WebhookStatus {
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(WebhookStatus::PendingOrder),
            1 => Some(WebhookStatus::Processed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookStatus::PendingOrder => "pending_order",
            WebhookStatus::Processed => "processed",
        }
    }
}

impl fmt::Display for WebhookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Row in `webhook_logs_tb`. The unique `idempotency_key` is the idempotency
/// primitive; `payload` keeps the raw delivery for reconciliation.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WebhookLog {
    pub id: i64,
    pub idempotency_key: String,
    pub payload: serde_json::Value,
    pub status: WebhookStatus,
    pub processed_at: Option<DateTime<Utc>>,
}

/// Payment outcome reported by the upstream payment system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Success,
    Failed,
}

impl PaymentStatus {
    pub fn parse(s: &str) -> Result<Self, WebhookError> {
        match s {
            "success" => Ok(PaymentStatus::Success),
            "failed" => Ok(PaymentStatus::Failed),
            other => Err(WebhookError::InvalidPaymentStatus(other.to_string())),
        }
    }
}

/// Validated webhook payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub order_id: i64,
    pub payment_status: String,
    pub idempotency_key: String,
}

/// Payload as delivered on the wire, before presence validation.
#[derive(Debug, Clone, Deserialize)]
pub struct RawWebhookPayload {
    pub order_id: Option<i64>,
    pub payment_status: Option<String>,
    pub idempotency_key: Option<String>,
}

impl RawWebhookPayload {
    /// All three fields are required; the first missing one is reported.
    pub fn validate(self) -> Result<WebhookPayload, WebhookError> {
        let order_id = self
            .order_id
            .ok_or_else(|| WebhookError::MissingField("order_id"))?;
        let payment_status = self
            .payment_status
            .ok_or_else(|| WebhookError::MissingField("payment_status"))?;
        let idempotency_key = self
            .idempotency_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| WebhookError::MissingField("idempotency_key"))?;

        Ok(WebhookPayload {
            order_id,
            payment_status,
            idempotency_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(order_id: Option<i64>, status: Option<&str>, key: Option<&str>) -> RawWebhookPayload {
        RawWebhookPayload {
            order_id,
            payment_status: status.map(String::from),
            idempotency_key: key.map(String::from),
        }
    }

    #[test]
    fn test_validate_complete_payload() {
        let payload = raw(Some(1), Some("success"), Some("k1")).validate().unwrap();
        assert_eq!(payload.order_id, 1);
        assert_eq!(payload.payment_status, "success");
        assert_eq!(payload.idempotency_key, "k1");
    }

    #[test]
    fn test_validate_reports_missing_fields() {
        assert!(matches!(
            raw(None, Some("success"), Some("k")).validate(),
            Err(WebhookError::MissingField("order_id"))
        ));
        assert!(matches!(
            raw(Some(1), None, Some("k")).validate(),
            Err(WebhookError::MissingField("payment_status"))
        ));
        assert!(matches!(
            raw(Some(1), Some("success"), None).validate(),
            Err(WebhookError::MissingField("idempotency_key"))
        ));
        // An empty key is as useless as a missing one
        assert!(matches!(
            raw(Some(1), Some("success"), Some("")).validate(),
            Err(WebhookError::MissingField("idempotency_key"))
        ));
    }

    #[test]
    fn test_payment_status_parse() {
        assert_eq!(PaymentStatus::parse("success").unwrap(), PaymentStatus::Success);
        assert_eq!(PaymentStatus::parse("failed").unwrap(), PaymentStatus::Failed);
        assert!(matches!(
            PaymentStatus::parse("refunded"),
            Err(WebhookError::InvalidPaymentStatus(_))
        ));
    }

    #[test]
    fn test_webhook_status_roundtrip() {
        for status in [WebhookStatus::PendingOrder, WebhookStatus::Processed] {
            assert_eq!(WebhookStatus::from_id(status.id()), Some(status));
        }
        assert!(WebhookStatus::from_id(7).is_none());
    }
}
