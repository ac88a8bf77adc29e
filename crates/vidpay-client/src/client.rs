//! HTTP client for the vidpay settlement service.

use std::time::Duration;

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ClientError;
use crate::types::{
    BalanceResponse, PurchaseRequest, PurchaseResponse, SubmitRechargeRequest,
    SubmitRechargeResponse, TransactionsResponse, WithdrawalRequest, WithdrawalResponse,
};

/// Options for constructing a [`VidpayClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Base URL of the vidpay service.
    pub base_url: String,

    /// Bearer token presented on every request.
    pub token: String,

    /// Request timeout. Defaults to 30 seconds.
    pub timeout: Duration,
}

impl ClientOptions {
    /// Create options with default timeout.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Client for the vidpay settlement API.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct VidpayClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl VidpayClient {
    /// Create a new client with default options.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] if the base URL is empty
    /// and [`ClientError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_options(ClientOptions::new(base_url, token))
    }

    /// Create a new client from explicit options.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] if the base URL is empty
    /// and [`ClientError::Http`] if the HTTP client cannot be built.
    pub fn with_options(options: ClientOptions) -> Result<Self, ClientError> {
        if options.base_url.is_empty() {
            return Err(ClientError::Configuration("base URL is empty".into()));
        }

        let http = reqwest::Client::builder()
            .timeout(options.timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: options.base_url.trim_end_matches('/').to_string(),
            token: options.token,
        })
    }

    /// Fetch the authenticated user's balance summary.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server rejects it.
    pub async fn balance(&self) -> Result<BalanceResponse, ClientError> {
        self.get("/balance").await
    }

    /// Fetch one page of the user's ledger, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server rejects it.
    pub async fn list_transactions(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<TransactionsResponse, ClientError> {
        self.get(&format!("/transactions?limit={limit}&offset={offset}"))
            .await
    }

    /// Submit a manual recharge claim for admin review.
    ///
    /// The claim credits nothing until an admin settles it; quote the
    /// returned transaction id when paying.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server rejects it,
    /// including [`ClientError::RateLimited`] when the per-user window
    /// is exhausted.
    pub async fn submit_recharge(
        &self,
        request: &SubmitRechargeRequest,
    ) -> Result<SubmitRechargeResponse, ClientError> {
        self.post("/recharge/manual", request).await
    }

    /// Buy a catalog item, debiting the balance.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InsufficientBalance`] when the balance
    /// does not cover the price, and other errors when the request
    /// fails or the server rejects it.
    pub async fn purchase(&self, request: &PurchaseRequest) -> Result<PurchaseResponse, ClientError> {
        self.post("/purchase", request).await
    }

    /// Request a withdrawal; the amount is held immediately.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InsufficientBalance`] when the balance
    /// does not cover the amount, and other errors when the request
    /// fails or the server rejects it.
    pub async fn request_withdrawal(
        &self,
        request: &WithdrawalRequest,
    ) -> Result<WithdrawalResponse, ClientError> {
        self.post("/withdrawal/request", request).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self
            .http
            .get(format!("{}{path}", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let response = self
            .http
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());

        let body: serde_json::Value = response.json().await.unwrap_or_default();
        let code = body["error"]["code"].as_str().unwrap_or("unknown").to_string();
        let message = body["error"]["message"]
            .as_str()
            .unwrap_or("unknown error")
            .to_string();
        tracing::debug!(status = %status, code = %code, "vidpay API request failed");

        if status == StatusCode::PAYMENT_REQUIRED {
            let details = &body["error"]["details"];
            return Err(ClientError::InsufficientBalance {
                balance_cents: details["balance_cents"].as_i64().unwrap_or(0),
                required_cents: details["required_cents"].as_i64().unwrap_or(0),
            });
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ClientError::RateLimited {
                retry_after_secs: retry_after.unwrap_or(0),
            });
        }

        Err(ClientError::Api {
            code,
            message,
            status: status.as_u16(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{bearer_token, body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> VidpayClient {
        VidpayClient::new(server.uri(), "test-token").unwrap()
    }

    #[tokio::test]
    async fn balance_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/balance"))
            .and(bearer_token("test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "balance_cents": 7500,
                "lifetime_recharged_cents": 10_000,
                "lifetime_spent_cents": 2500
            })))
            .mount(&server)
            .await;

        let balance = client_for(&server).await.balance().await.unwrap();
        assert_eq!(balance.balance_cents, 7500);
        assert_eq!(balance.lifetime_spent_cents, 2500);
    }

    #[tokio::test]
    async fn list_transactions_passes_paging() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/transactions"))
            .and(query_param("limit", "2"))
            .and(query_param("offset", "4"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "transactions": [] })),
            )
            .mount(&server)
            .await;

        let page = client_for(&server)
            .await
            .list_transactions(2, 4)
            .await
            .unwrap();
        assert!(page.transactions.is_empty());
    }

    #[tokio::test]
    async fn purchase_posts_body_and_decodes_receipt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/purchase"))
            .and(body_partial_json(json!({ "item_id": "vid_42", "price_cents": 2500 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "order_id": "11111111-1111-1111-1111-111111111111",
                "transaction_id": "01ARZ3NDEKTSV4RRFFQ69G5FAV",
                "balance_cents": 7500
            })))
            .mount(&server)
            .await;

        let receipt = client_for(&server)
            .await
            .purchase(&PurchaseRequest {
                item_id: "vid_42".into(),
                price_cents: 2500,
                license_type: None,
            })
            .await
            .unwrap();
        assert_eq!(receipt.balance_cents, 7500);
    }

    #[tokio::test]
    async fn insufficient_balance_is_typed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/purchase"))
            .respond_with(ResponseTemplate::new(402).set_body_json(json!({
                "error": {
                    "code": "insufficient_balance",
                    "message": "insufficient balance",
                    "details": { "balance_cents": 100, "required_cents": 500 }
                }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .purchase(&PurchaseRequest {
                item_id: "vid_1".into(),
                price_cents: 500,
                license_type: None,
            })
            .await
            .unwrap_err();

        match err {
            ClientError::InsufficientBalance {
                balance_cents,
                required_cents,
            } => {
                assert_eq!(balance_cents, 100);
                assert_eq!(required_cents, 500);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn rate_limited_carries_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/recharge/manual"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("retry-after", "37")
                    .set_body_json(json!({
                        "error": { "code": "rate_limited", "message": "too many requests" }
                    })),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .submit_recharge(&SubmitRechargeRequest {
                amount_cents: 100,
                method: None,
            })
            .await
            .unwrap_err();

        match err {
            ClientError::RateLimited { retry_after_secs } => assert_eq!(retry_after_secs, 37),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn api_errors_surface_code_and_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/withdrawal/request"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "code": "bad_request", "message": "payout_account must not be empty" }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .request_withdrawal(&WithdrawalRequest {
                amount_cents: 500,
                payout_account: String::new(),
            })
            .await
            .unwrap_err();

        match err {
            ClientError::Api { code, status, .. } => {
                assert_eq!(code, "bad_request");
                assert_eq!(status, 400);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_base_url_is_a_configuration_error() {
        let err = VidpayClient::new("", "token").unwrap_err();
        assert!(matches!(err, ClientError::Configuration(_)));
    }
}
