//! Firebase Authentication over the Identity Toolkit REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

use cipherbox_core::config::IdentityConfig;
use cipherbox_core::error::{AppError, ErrorKind};
use cipherbox_core::result::AppResult;
use cipherbox_core::traits::IdentityProvider;
use cipherbox_core::types::{NewIdentity, UserId, VerifiedIdentity};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    #[serde(default)]
    email: String,
    id_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignUpResponse {
    local_id: String,
    id_token: String,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    #[serde(default)]
    email_verified: bool,
}

#[derive(Debug, Deserialize)]
struct CreateAuthUriResponse {
    #[serde(default)]
    registered: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Identity provider backed by Firebase Authentication.
#[derive(Debug, Clone)]
pub struct FirebaseIdentityProvider {
    http_client: Client,
    endpoint: String,
    api_key: String,
}

impl FirebaseIdentityProvider {
    pub fn new(config: &IdentityConfig) -> AppResult<Self> {
        if config.api_key.is_empty() {
            return Err(AppError::configuration(
                "identity.api_key is required for the firebase provider",
            ));
        }
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| {
                AppError::with_source(ErrorKind::Configuration, "creating HTTP client", e)
            })?;

        Ok(Self {
            http_client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: Value) -> AppResult<T> {
        let url = format!("{}/accounts:{}?key={}", self.endpoint, method, self.api_key);
        debug!(method, "Calling identity toolkit");

        let response = self
            .http_client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::IoFailure,
                    format!("Identity provider unreachable ({method})"),
                    e,
                )
            })?;

        let status = response.status();
        if status.is_success() {
            return response.json::<T>().await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Serialization,
                    format!("Unexpected identity provider response ({method})"),
                    e,
                )
            });
        }

        let code = response
            .json::<ErrorEnvelope>()
            .await
            .map(|e| e.error.message)
            .unwrap_or_default();
        warn!(method, status = %status, code = %code, "Identity provider rejected request");
        Err(map_provider_error(status, &code))
    }

    async fn lookup_email_verified(&self, id_token: &str) -> AppResult<bool> {
        let lookup: LookupResponse = self.call("lookup", json!({ "idToken": id_token })).await?;
        Ok(lookup.users.first().is_some_and(|u| u.email_verified))
    }
}

/// Translate an Identity Toolkit error into an [`AppError`].
///
/// The provider's message looks like `WEAK_PASSWORD : Password should be...`;
/// only the leading code is significant.
fn map_provider_error(status: StatusCode, message: &str) -> AppError {
    if status.is_server_error() {
        return AppError::io_failure(format!("Identity provider error ({status})"));
    }

    let code = message.split([' ', ':']).next().unwrap_or_default();
    match code {
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "USER_DISABLED" => {
            AppError::invalid_credentials("Incorrect email or password")
        }
        "EMAIL_EXISTS" => AppError::conflict("Email already in use"),
        "INVALID_EMAIL" => AppError::validation("Please enter a valid email"),
        "WEAK_PASSWORD" => AppError::validation("Password is too weak"),
        "TOO_MANY_ATTEMPTS_TRY_LATER" => {
            AppError::io_failure("Too many attempts, try again later")
        }
        _ => AppError::internal(format!("Identity provider error: {message}")),
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> AppResult<VerifiedIdentity> {
        let signed_in: SignInResponse = self
            .call(
                "signInWithPassword",
                json!({ "email": email, "password": password, "returnSecureToken": true }),
            )
            .await?;
        let email_verified = self.lookup_email_verified(&signed_in.id_token).await?;

        Ok(VerifiedIdentity {
            uid: UserId::new(signed_in.local_id),
            email: if signed_in.email.is_empty() {
                email.to_string()
            } else {
                signed_in.email
            },
            email_verified,
        })
    }

    async fn sign_up(&self, email: &str, password: &str) -> AppResult<NewIdentity> {
        let created: SignUpResponse = self
            .call(
                "signUp",
                json!({ "email": email, "password": password, "returnSecureToken": true }),
            )
            .await?;

        Ok(NewIdentity {
            uid: UserId::new(created.local_id),
            email: email.to_string(),
            id_token: created.id_token,
        })
    }

    async fn send_verification(&self, identity: &NewIdentity) -> AppResult<()> {
        let _: Value = self
            .call(
                "sendOobCode",
                json!({ "requestType": "VERIFY_EMAIL", "idToken": identity.id_token }),
            )
            .await?;
        Ok(())
    }

    async fn email_in_use(&self, email: &str) -> AppResult<bool> {
        let uri: CreateAuthUriResponse = self
            .call(
                "createAuthUri",
                json!({ "identifier": email, "continueUri": "http://localhost" }),
            )
            .await?;
        Ok(uri.registered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_errors() {
        for code in [
            "EMAIL_NOT_FOUND",
            "INVALID_PASSWORD",
            "INVALID_LOGIN_CREDENTIALS",
            "USER_DISABLED : The user account has been disabled",
        ] {
            let err = map_provider_error(StatusCode::BAD_REQUEST, code);
            assert_eq!(err.kind, ErrorKind::InvalidCredentials, "{code}");
        }
    }

    #[test]
    fn test_signup_errors() {
        let err = map_provider_error(StatusCode::BAD_REQUEST, "EMAIL_EXISTS");
        assert_eq!(err.kind, ErrorKind::Conflict);

        let err = map_provider_error(
            StatusCode::BAD_REQUEST,
            "WEAK_PASSWORD : Password should be at least 6 characters",
        );
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[test]
    fn test_server_errors_are_retryable() {
        let err = map_provider_error(StatusCode::SERVICE_UNAVAILABLE, "");
        assert!(err.is_retryable());

        let err = map_provider_error(StatusCode::BAD_REQUEST, "SOMETHING_NEW");
        assert_eq!(err.kind, ErrorKind::Internal);
    }

    #[test]
    fn test_new_requires_api_key() {
        let err = FirebaseIdentityProvider::new(&IdentityConfig::default()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }
}
