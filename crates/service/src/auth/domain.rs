use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::errors::{AuthError, TokenFailure};
use crate::validation::RequiredFields;

/// Role sent to the token service when the account service does not return one.
pub const DEFAULT_ROLE: &str = "User";

/// Sign-up input. Only the email is forwarded to the account service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    #[serde(default, alias = "Email")]
    pub email: String,
    #[serde(default, alias = "Password")]
    pub password: String,
}

impl RequiredFields for SignUpRequest {
    fn required_fields(&self) -> Vec<(&'static str, &str)> {
        vec![("email", &self.email), ("password", &self.password)]
    }
}

/// Sign-in input
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    #[serde(default, alias = "Email")]
    pub email: String,
    #[serde(default, alias = "Password")]
    pub password: String,
}

impl RequiredFields for SignInRequest {
    fn required_fields(&self) -> Vec<(&'static str, &str)> {
        vec![("email", &self.email), ("password", &self.password)]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignOutRequest {
    #[serde(default, alias = "UserId")]
    pub user_id: String,
}

impl RequiredFields for SignOutRequest {
    fn required_fields(&self) -> Vec<(&'static str, &str)> {
        vec![("userId", &self.user_id)]
    }
}

/// Full profile sent to the account service to finish a registration.
/// Fields not listed here are kept in `profile` and forwarded untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRegistrationRequest {
    #[serde(default, alias = "Email")]
    pub email: String,
    #[serde(default, alias = "Password")]
    pub password: String,
    #[serde(default, alias = "FirstName")]
    pub first_name: String,
    #[serde(default, alias = "LastName")]
    pub last_name: String,
    #[serde(default, alias = "PhoneNumber", skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, alias = "StreetName", skip_serializing_if = "Option::is_none")]
    pub street_name: Option<String>,
    #[serde(default, alias = "PostalCode", skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, alias = "City", skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

impl RequiredFields for CompleteRegistrationRequest {
    fn required_fields(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("email", &self.email),
            ("password", &self.password),
            ("firstName", &self.first_name),
            ("lastName", &self.last_name),
        ]
    }
}

/// Accepts a string or a number and keeps it as an opaque string.
fn opaque_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn non_blank(v: &Option<String>) -> Option<&str> {
    v.as_deref().filter(|s| !s.trim().is_empty())
}

/// `data.user` as the account service sends it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountUser {
    #[serde(default, alias = "Id", deserialize_with = "opaque_id")]
    pub id: Option<String>,
    #[serde(default, alias = "Email")]
    pub email: Option<String>,
    #[serde(default, alias = "FirstName")]
    pub first_name: Option<String>,
    #[serde(default, alias = "LastName")]
    pub last_name: Option<String>,
    #[serde(default, alias = "Role")]
    pub role: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountServiceData {
    #[serde(default, alias = "Id", deserialize_with = "opaque_id")]
    pub id: Option<String>,
    #[serde(default, alias = "UserId", deserialize_with = "opaque_id")]
    pub user_id: Option<String>,
    #[serde(default, alias = "User")]
    pub user: Option<AccountUser>,
}

/// Typed account-service response. Every field is optional; which ones are
/// present varies between account-service endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountServiceResponse {
    #[serde(default, alias = "Succeeded")]
    pub succeeded: Option<bool>,
    #[serde(default, alias = "Message")]
    pub message: Option<String>,
    #[serde(default, alias = "Id", deserialize_with = "opaque_id")]
    pub id: Option<String>,
    #[serde(default, alias = "UserId", deserialize_with = "opaque_id")]
    pub user_id: Option<String>,
    #[serde(default, alias = "Data")]
    pub data: Option<AccountServiceData>,
}

/// Account id lookup, first non-blank wins:
/// `data.user.id`, `id`, `data.id`, `data.userId`, `userId`.
pub fn extract_account_id(resp: &AccountServiceResponse) -> Option<String> {
    let data = resp.data.as_ref();
    data.and_then(|d| d.user.as_ref()).and_then(|u| non_blank(&u.id))
        .or_else(|| non_blank(&resp.id))
        .or_else(|| data.and_then(|d| non_blank(&d.id)))
        .or_else(|| data.and_then(|d| non_blank(&d.user_id)))
        .or_else(|| non_blank(&resp.user_id))
        .map(str::to_string)
}

impl AccountServiceResponse {
    /// Build the request-scoped account copy, or `None` when no id can be
    /// extracted. `fallback_email` is used when the response carries none.
    pub fn into_account(self, fallback_email: &str) -> Option<AccountRecord> {
        let id = extract_account_id(&self)?;
        let user = self.data.and_then(|d| d.user).unwrap_or_default();
        let email = non_blank(&user.email).unwrap_or(fallback_email).to_string();
        Some(AccountRecord {
            id,
            email,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            extra: user.extra,
        })
    }
}

/// Read-only copy of the account the account service returned.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AccountRecord {
    pub fn role_or_default(&self) -> &str {
        non_blank(&self.role).unwrap_or(DEFAULT_ROLE)
    }
}

/// Body of `POST /GenerateToken`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    pub user_id: String,
    pub email: String,
    pub role: String,
}

/// Token-service response. `accessToken` is required on the wire; a missing
/// `succeeded` flag reads as `false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    #[serde(alias = "AccessToken")]
    pub access_token: String,
    #[serde(default, alias = "RefreshToken", skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, alias = "Succeeded", skip_serializing)]
    pub succeeded: bool,
    #[serde(default, alias = "Message", skip_serializing)]
    pub message: Option<String>,
}

impl TokenPair {
    pub fn is_usable(&self) -> bool {
        self.succeeded && !self.access_token.trim().is_empty()
    }
}

/// Outcome of a successful orchestration. The only constructor checks that
/// both an account id and an access token are present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrchestrationResult {
    succeeded: bool,
    message: String,
    #[serde(rename = "user")]
    account: AccountRecord,
    #[serde(flatten)]
    tokens: TokenPair,
}

impl OrchestrationResult {
    pub fn success(
        message: impl Into<String>,
        account: AccountRecord,
        tokens: TokenPair,
    ) -> Result<Self, AuthError> {
        if account.id.trim().is_empty() {
            return Err(AuthError::UserIdMissing);
        }
        if !tokens.is_usable() {
            return Err(AuthError::TokenGenerationFailed(TokenFailure::Refused));
        }
        Ok(Self { succeeded: true, message: message.into(), account, tokens })
    }

    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn account(&self) -> &AccountRecord {
        &self.account
    }

    pub fn tokens(&self) -> &TokenPair {
        &self.tokens
    }
}

/// Plain `{succeeded, message}` acknowledgment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Acknowledgement {
    pub succeeded: bool,
    pub message: String,
}

impl Acknowledgement {
    pub fn ok(message: impl Into<String>) -> Self {
        Self { succeeded: true, message: message.into() }
    }
}
