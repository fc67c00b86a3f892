use crate::gateways::{FetchedPayment, GatewayError, GatewayOrder, PaymentGateway};
use serde_json::json;

pub struct RazorpayGateway {
    pub base_url: String,
    pub key_id: String,
    pub key_secret: String,
    pub timeout_ms: u64,
    pub client: reqwest::Client,
}

impl RazorpayGateway {
    fn classify(e: reqwest::Error) -> GatewayError {
        if e.is_timeout() {
            GatewayError::Timeout
        } else {
            GatewayError::Network(e.to_string())
        }
    }
}

#[async_trait::async_trait]
impl PaymentGateway for RazorpayGateway {
    fn name(&self) -> &'static str {
        "razorpay"
    }

    async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
    ) -> Result<GatewayOrder, GatewayError> {
        let order_url = format!("{}/v1/orders", self.base_url);
        let body = json!({
            "amount": amount_minor,
            "currency": currency,
            "payment_capture": 1
        });

        let resp = self
            .client
            .post(order_url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .timeout(std::time::Duration::from_millis(self.timeout_ms))
            .send()
            .await
            .map_err(Self::classify)?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Upstream {
                status,
                body: body.chars().take(200).collect(),
            });
        }

        let v: serde_json::Value = resp.json().await.map_err(Self::classify)?;
        Ok(GatewayOrder {
            gateway_order_id: v
                .get("id")
                .and_then(|id| id.as_str())
                .unwrap_or_default()
                .to_string(),
            amount_minor: v.get("amount").and_then(|a| a.as_i64()).unwrap_or(amount_minor),
            currency: v
                .get("currency")
                .and_then(|c| c.as_str())
                .unwrap_or(currency)
                .to_string(),
        })
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<FetchedPayment, GatewayError> {
        let payment_url = format!("{}/v1/payments/{}", self.base_url, payment_id);

        let resp = self
            .client
            .get(payment_url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .timeout(std::time::Duration::from_millis(self.timeout_ms))
            .send()
            .await
            .map_err(Self::classify)?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Upstream {
                status,
                body: body.chars().take(200).collect(),
            });
        }

        let http_status = resp.status().as_u16();
        let v: serde_json::Value = resp.json().await.map_err(Self::classify)?;
        parse_payment_response(payment_id, http_status, &v)
    }
}

/// Pulls the fields the finalizer relies on out of a payment lookup response.
/// A response without an integer `amount` is an upstream fault, never a
/// zero-amount payment; a missing `status` is simply not a capture.
pub fn parse_payment_response(
    payment_id: &str,
    http_status: u16,
    v: &serde_json::Value,
) -> Result<FetchedPayment, GatewayError> {
    let amount_minor = v
        .get("amount")
        .and_then(|a| a.as_i64())
        .ok_or_else(|| GatewayError::Upstream {
            status: http_status,
            body: "payment response missing integer amount".to_string(),
        })?;

    Ok(FetchedPayment {
        payment_id: v
            .get("id")
            .and_then(|id| id.as_str())
            .unwrap_or(payment_id)
            .to_string(),
        gateway_order_id: v
            .get("order_id")
            .and_then(|o| o.as_str())
            .map(ToString::to_string),
        amount_minor,
        currency: v
            .get("currency")
            .and_then(|c| c.as_str())
            .unwrap_or("INR")
            .to_string(),
        status: v
            .get("status")
            .and_then(|s| s.as_str())
            .unwrap_or("unknown")
            .to_string(),
    })
}
