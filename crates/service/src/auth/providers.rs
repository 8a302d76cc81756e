use async_trait::async_trait;
use configs::{ServiceEndpoint, ServiceTarget};
use reqwest::Method;
use serde_json::json;

use super::domain::{AccountServiceResponse, CompleteRegistrationRequest, TokenPair, TokenRequest};
use crate::downstream::{build_url, DownstreamClient, DownstreamError};

/// Account service operations used by the orchestrator.
#[async_trait]
pub trait AccountProvider: Send + Sync {
    async fn create_account(&self, email: &str) -> Result<AccountServiceResponse, DownstreamError>;
    async fn validate_credentials(&self, email: &str, password: &str) -> Result<AccountServiceResponse, DownstreamError>;
    async fn complete_registration(&self, form: &CompleteRegistrationRequest) -> Result<AccountServiceResponse, DownstreamError>;
}

/// Token service operations used by the orchestrator.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn generate_token(&self, request: &TokenRequest) -> Result<TokenPair, DownstreamError>;
}

pub struct HttpAccountProvider {
    client: DownstreamClient,
    endpoint: ServiceEndpoint,
}

impl HttpAccountProvider {
    pub fn new(client: DownstreamClient, endpoint: ServiceEndpoint) -> Self {
        Self { client, endpoint }
    }

    async fn post<P>(&self, segments: &[&str], payload: &P) -> Result<AccountServiceResponse, DownstreamError>
    where
        P: serde::Serialize + Sync + ?Sized,
    {
        let url = build_url(&self.endpoint.base_url, segments)?;
        self.client
            .call(ServiceTarget::AccountService, Method::POST, url, Some(payload), self.endpoint.access_key.as_deref())
            .await
    }
}

#[async_trait]
impl AccountProvider for HttpAccountProvider {
    async fn create_account(&self, email: &str) -> Result<AccountServiceResponse, DownstreamError> {
        self.post(&["accounts"], &json!({ "email": email })).await
    }

    async fn validate_credentials(&self, email: &str, password: &str) -> Result<AccountServiceResponse, DownstreamError> {
        self.post(&["accounts", "validate"], &json!({ "email": email, "password": password })).await
    }

    async fn complete_registration(&self, form: &CompleteRegistrationRequest) -> Result<AccountServiceResponse, DownstreamError> {
        self.post(&["accounts", "complete-registration"], form).await
    }
}

pub struct HttpTokenProvider {
    client: DownstreamClient,
    endpoint: ServiceEndpoint,
}

impl HttpTokenProvider {
    pub fn new(client: DownstreamClient, endpoint: ServiceEndpoint) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl TokenProvider for HttpTokenProvider {
    async fn generate_token(&self, request: &TokenRequest) -> Result<TokenPair, DownstreamError> {
        let url = build_url(&self.endpoint.base_url, &["GenerateToken"])?;
        self.client
            .call(ServiceTarget::TokenService, Method::POST, url, Some(request), self.endpoint.access_key.as_deref())
            .await
    }
}

/// Scripted in-memory providers for tests. Every call is recorded.
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    pub enum AccountCall {
        Create { email: String },
        Validate { email: String, password: String },
        Complete { email: String },
    }

    #[derive(Default)]
    pub struct MockAccountProvider {
        reply: Mutex<Option<Result<AccountServiceResponse, DownstreamError>>>,
        calls: Mutex<Vec<AccountCall>>,
    }

    impl MockAccountProvider {
        pub fn replying(reply: Result<AccountServiceResponse, DownstreamError>) -> Self {
            Self { reply: Mutex::new(Some(reply)), calls: Mutex::default() }
        }

        /// Reply with a parsed JSON body.
        pub fn with_body(body: serde_json::Value) -> Self {
            Self::replying(Ok(serde_json::from_value(body).unwrap()))
        }

        pub fn calls(&self) -> Vec<AccountCall> {
            self.calls.lock().unwrap().clone()
        }

        fn answer(&self, call: AccountCall) -> Result<AccountServiceResponse, DownstreamError> {
            self.calls.lock().unwrap().push(call);
            self.reply
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| Err(DownstreamError::TransportFailure("no scripted reply".into())))
        }
    }

    #[async_trait]
    impl AccountProvider for MockAccountProvider {
        async fn create_account(&self, email: &str) -> Result<AccountServiceResponse, DownstreamError> {
            self.answer(AccountCall::Create { email: email.to_string() })
        }

        async fn validate_credentials(&self, email: &str, password: &str) -> Result<AccountServiceResponse, DownstreamError> {
            self.answer(AccountCall::Validate { email: email.to_string(), password: password.to_string() })
        }

        async fn complete_registration(&self, form: &CompleteRegistrationRequest) -> Result<AccountServiceResponse, DownstreamError> {
            self.answer(AccountCall::Complete { email: form.email.clone() })
        }
    }

    #[derive(Default)]
    pub struct MockTokenProvider {
        reply: Mutex<Option<Result<TokenPair, DownstreamError>>>,
        calls: Mutex<Vec<TokenRequest>>,
    }

    impl MockTokenProvider {
        pub fn replying(reply: Result<TokenPair, DownstreamError>) -> Self {
            Self { reply: Mutex::new(Some(reply)), calls: Mutex::default() }
        }

        /// A successful token pair.
        pub fn issuing(access: &str, refresh: Option<&str>) -> Self {
            Self::replying(Ok(TokenPair {
                access_token: access.to_string(),
                refresh_token: refresh.map(str::to_string),
                succeeded: true,
                message: None,
            }))
        }

        pub fn calls(&self) -> Vec<TokenRequest> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TokenProvider for MockTokenProvider {
        async fn generate_token(&self, request: &TokenRequest) -> Result<TokenPair, DownstreamError> {
            self.calls.lock().unwrap().push(request.clone());
            self.reply
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| Err(DownstreamError::TransportFailure("no scripted reply".into())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::net::TcpListener;

    type Seen = Arc<Mutex<Vec<(String, Option<String>, serde_json::Value)>>>;

    async fn record(
        State(seen): State<Seen>,
        uri: axum::http::Uri,
        headers: HeaderMap,
        Json(body): Json<serde_json::Value>,
    ) -> Json<serde_json::Value> {
        let key = headers.get("x-functions-key").and_then(|v| v.to_str().ok()).map(str::to_string);
        seen.lock().unwrap().push((uri.path().to_string(), key, body));
        Json(json!({ "succeeded": true, "accessToken": "tok", "data": { "user": { "id": "u-1" } } }))
    }

    async fn stub() -> (String, Seen) {
        let seen: Seen = Arc::default();
        let router = Router::new()
            .route("/api/accounts", post(record))
            .route("/api/accounts/validate", post(record))
            .route("/api/GenerateToken", post(record))
            .with_state(seen.clone());
        let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        (format!("http://{addr}/api"), seen)
    }

    fn client() -> DownstreamClient {
        DownstreamClient::new(Duration::from_secs(2), Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn create_account_sends_only_the_email() {
        let (base, seen) = stub().await;
        let provider = HttpAccountProvider::new(
            client(),
            ServiceEndpoint { base_url: base, access_key: Some("acct-key".into()) },
        );
        let resp = provider.create_account("a@b.io").await.unwrap();
        assert_eq!(resp.data.unwrap().user.unwrap().id.as_deref(), Some("u-1"));

        let seen = seen.lock().unwrap();
        let (path, key, body) = &seen[0];
        assert_eq!(path, "/api/accounts");
        assert_eq!(key.as_deref(), Some("acct-key"));
        assert_eq!(body, &json!({ "email": "a@b.io" }));
    }

    #[tokio::test]
    async fn token_request_uses_camel_case() {
        let (base, seen) = stub().await;
        let provider = HttpTokenProvider::new(client(), ServiceEndpoint { base_url: base, access_key: None });
        let pair = provider
            .generate_token(&TokenRequest { user_id: "u-1".into(), email: "a@b.io".into(), role: "User".into() })
            .await
            .unwrap();
        assert!(pair.is_usable());

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].0, "/api/GenerateToken");
        assert_eq!(seen[0].1, None);
        assert_eq!(seen[0].2, json!({ "userId": "u-1", "email": "a@b.io", "role": "User" }));
    }
}
