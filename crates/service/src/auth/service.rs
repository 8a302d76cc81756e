use std::sync::Arc;

use tracing::{field, info, instrument, warn, Span};

use super::domain::{
    AccountRecord, Acknowledgement, CompleteRegistrationRequest, OrchestrationResult, SignInRequest,
    SignOutRequest, SignUpRequest, TokenRequest,
};
use super::errors::{AuthError, TokenFailure};
use super::providers::{AccountProvider, TokenProvider};
use crate::observability::AUTH_FAILURES_TOTAL;
use crate::validation::validate;

/// Auth workflows over the account and token services, independent of the
/// web framework. Every method takes the raw request body.
pub struct AuthService<A: AccountProvider, T: TokenProvider> {
    accounts: Arc<A>,
    tokens: Arc<T>,
}

impl<A: AccountProvider, T: TokenProvider> AuthService<A, T> {
    pub fn new(accounts: Arc<A>, tokens: Arc<T>) -> Self {
        Self { accounts, tokens }
    }

    /// Create an account and issue its first token pair.
    ///
    /// Only the email is sent to the account service; the password is
    /// collected later by [`Self::complete_registration`].
    ///
    /// # Examples
    /// ```
    /// use service::auth::{AuthService, providers::mock::{MockAccountProvider, MockTokenProvider}};
    /// use std::sync::Arc;
    /// let accounts = Arc::new(MockAccountProvider::with_body(serde_json::json!({ "data": { "user": { "id": "u-1" } } })));
    /// let tokens = Arc::new(MockTokenProvider::issuing("access", None));
    /// let svc = AuthService::new(accounts, tokens);
    /// let out = tokio_test::block_on(svc.sign_up(br#"{"email":"user@example.com","password":"Secret123"}"#)).unwrap();
    /// assert_eq!(out.account().id, "u-1");
    /// assert_eq!(out.tokens().access_token, "access");
    /// ```
    #[instrument(skip_all, fields(email = field::Empty))]
    pub async fn sign_up(&self, raw: &[u8]) -> Result<OrchestrationResult, AuthError> {
        counted(async {
            let req: SignUpRequest = validate(raw)?;
            Span::current().record("email", req.email.as_str());

            let resp = self.accounts.create_account(&req.email).await.map_err(AuthError::from_account)?;
            let account = resp.into_account(&req.email).ok_or_else(|| {
                warn!("account service response carried no account id");
                AuthError::UserIdMissing
            })?;
            info!(user_id = %account.id, "account created");
            self.issue_tokens("Account created successfully", account).await
        })
        .await
    }

    /// Check credentials with the account service and issue a token pair.
    #[instrument(skip_all, fields(email = field::Empty))]
    pub async fn sign_in(&self, raw: &[u8]) -> Result<OrchestrationResult, AuthError> {
        counted(async {
            let req: SignInRequest = validate(raw)?;
            Span::current().record("email", req.email.as_str());

            let resp = self
                .accounts
                .validate_credentials(&req.email, &req.password)
                .await
                .map_err(AuthError::from_credentials_check)?;
            let account = resp.into_account(&req.email).ok_or(AuthError::InvalidCredentials)?;
            info!(user_id = %account.id, "credentials accepted");
            self.issue_tokens("Login successful", account).await
        })
        .await
    }

    /// Send the full profile to the account service and issue a token pair
    /// for the account it returns.
    #[instrument(skip_all, fields(email = field::Empty))]
    pub async fn complete_registration(&self, raw: &[u8]) -> Result<OrchestrationResult, AuthError> {
        counted(async {
            let form: CompleteRegistrationRequest = validate(raw)?;
            Span::current().record("email", form.email.as_str());

            let resp = self
                .accounts
                .complete_registration(&form)
                .await
                .map_err(AuthError::from_account)?;
            let account = resp.into_account(&form.email).ok_or_else(|| {
                warn!("account service response carried no account id");
                AuthError::UserIdMissing
            })?;
            info!(user_id = %account.id, "registration completed");
            self.issue_tokens("Registration completed successfully", account).await
        })
        .await
    }

    /// Stateless: nothing is revoked. The bearer token is checked by the
    /// caller before the body is read.
    #[instrument(skip_all, fields(user_id = field::Empty))]
    pub async fn sign_out(&self, raw: &[u8]) -> Result<Acknowledgement, AuthError> {
        counted(async {
            let req: SignOutRequest = validate(raw)?;
            Span::current().record("user_id", req.user_id.as_str());
            info!("user signed out");
            Ok::<_, AuthError>(Acknowledgement::ok("Signed out successfully"))
        })
        .await
    }

    async fn issue_tokens(&self, message: &str, account: AccountRecord) -> Result<OrchestrationResult, AuthError> {
        let request = TokenRequest {
            user_id: account.id.clone(),
            email: account.email.clone(),
            role: account.role_or_default().to_string(),
        };
        let tokens = self.tokens.generate_token(&request).await.map_err(AuthError::from_token)?;
        if !tokens.is_usable() {
            warn!(user_id = %account.id, reason = ?tokens.message, "token service returned no usable token");
            return Err(AuthError::TokenGenerationFailed(TokenFailure::Refused));
        }
        OrchestrationResult::success(message, account, tokens)
    }
}

async fn counted<T>(fut: impl std::future::Future<Output = Result<T, AuthError>>) -> Result<T, AuthError> {
    let result = fut.await;
    if let Err(e) = &result {
        AUTH_FAILURES_TOTAL.with_label_values(&[e.code()]).inc();
        warn!(code = e.code(), error = %e, "auth workflow failed");
    }
    result
}
