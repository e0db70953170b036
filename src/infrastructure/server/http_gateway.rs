use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use crate::application::ports::ServerGateway;
use crate::domain::entities::UserProfile;
use crate::domain::value_objects::AccountEmail;
use crate::shared::config::ServerConfig;
use crate::shared::error::AppError;

/// Historical path variants per logical operation, tried in order. The
/// backend has renamed these several times without retiring old routes;
/// which one answers depends on the deployed server version.
const PROBE_PATHS: [&str; 3] = ["/api/health", "/health", "/ping"];
const PROFILE_GET_PATHS: [&str; 4] = [
    "/api/users/profile",
    "/api/profile",
    "/api/v1/users/profile",
    "/getUserData",
];
const PROFILE_SET_PATHS: [&str; 3] = ["/api/users/profile", "/api/profile/update", "/updateUserData"];
const LOGIN_PATHS: [&str; 3] = ["/api/auth/login", "/api/login", "/login"];
const UPDATES_PATHS: [&str; 3] = ["/api/sync/updates", "/api/checkUpdates", "/checkUpdates"];
const NOTIFY_PATHS: [&str; 3] = ["/api/sync/notify", "/api/notifyChange", "/notifyChange"];

/// Reqwest-backed [`ServerGateway`] with endpoint failover.
///
/// Network errors, non-2xx statuses, and unrecognizable bodies all mean
/// "try the next path". Only 401/403 stops the loop: an expired token fails
/// identically on every variant, so retrying just burns the radio.
pub struct HttpServerGateway {
    client: reqwest::Client,
    base_url: String,
    probe_timeout: Duration,
    request_timeout: Duration,
    image_timeout: Duration,
}

impl HttpServerGateway {
    pub fn new(config: &ServerConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|err| AppError::ConfigurationError(err.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            probe_timeout: Duration::from_secs(config.probe_timeout_secs),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            image_timeout: Duration::from_secs(config.image_timeout_secs),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn auth_status(status: StatusCode) -> bool {
        status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
    }
}

/// Pull the profile object out of whichever envelope this server version
/// uses: `{user}`, `{profile}`, `{data}`, or the bare object itself.
pub(crate) fn extract_profile_value(body: &Value) -> Option<Value> {
    for envelope in ["user", "profile", "data"] {
        if let Some(inner) = body.get(envelope) {
            if inner.is_object() {
                return Some(inner.clone());
            }
        }
    }
    if body.is_object() && body.get("email").is_some() {
        return Some(body.clone());
    }
    None
}

pub(crate) fn parse_profile(body: &Value) -> Option<UserProfile> {
    let value = extract_profile_value(body)?;
    serde_json::from_value(value).ok()
}

/// `hasUpdates` in any of its historical spellings and nestings.
pub(crate) fn parse_updates_flag(body: &Value) -> Option<bool> {
    body.get("hasUpdates")
        .or_else(|| body.get("updates"))
        .or_else(|| body.get("data").and_then(|d| d.get("hasUpdates")))
        .and_then(Value::as_bool)
}

#[async_trait]
impl ServerGateway for HttpServerGateway {
    async fn probe(&self) -> bool {
        for path in PROBE_PATHS {
            let result = self
                .client
                .get(self.url(path))
                .timeout(self.probe_timeout)
                .send()
                .await;

            // Any response at all means the server is reachable.
            if result.is_ok() {
                return true;
            }
        }
        debug!("connectivity probe failed on all paths");
        false
    }

    async fn fetch_profile(
        &self,
        email: &AccountEmail,
        token: Option<&str>,
    ) -> Result<Option<UserProfile>, AppError> {
        let mut saw_empty_success = false;

        for path in PROFILE_GET_PATHS {
            let mut request = self
                .client
                .get(self.url(path))
                .query(&[("email", email.as_str())])
                .timeout(self.request_timeout);
            if let Some(token) = token {
                request = request.bearer_auth(token);
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(err) => {
                    debug!(path, error = %err, "profile fetch failed, trying next endpoint");
                    continue;
                }
            };

            if Self::auth_status(response.status()) {
                return Err(AppError::Auth(format!(
                    "profile fetch rejected with {}",
                    response.status()
                )));
            }
            if !response.status().is_success() {
                debug!(path, status = %response.status(), "unexpected status, trying next endpoint");
                continue;
            }

            let body: Value = match response.json().await {
                Ok(body) => body,
                Err(err) => {
                    debug!(path, error = %err, "unparseable body, trying next endpoint");
                    continue;
                }
            };

            if let Some(profile) = parse_profile(&body) {
                return Ok(Some(profile));
            }
            // A success body with no profile in any known shape means the
            // server has nothing for this account.
            saw_empty_success = true;
        }

        if saw_empty_success {
            Ok(None)
        } else {
            Err(AppError::Network(
                "all profile endpoints failed".to_string(),
            ))
        }
    }

    async fn push_profile(&self, profile: &UserProfile) -> Result<(), AppError> {
        // Image payloads are large; give them a longer budget.
        let timeout = if profile.has_image() {
            self.image_timeout
        } else {
            self.request_timeout
        };

        for path in PROFILE_SET_PATHS {
            let response = match self
                .client
                .post(self.url(path))
                .timeout(timeout)
                .json(profile)
                .send()
                .await
            {
                Ok(response) => response,
                Err(err) => {
                    debug!(path, error = %err, "profile push failed, trying next endpoint");
                    continue;
                }
            };

            if Self::auth_status(response.status()) {
                return Err(AppError::Auth(format!(
                    "profile push rejected with {}",
                    response.status()
                )));
            }
            if response.status().is_success() {
                return Ok(());
            }
            debug!(path, status = %response.status(), "unexpected status, trying next endpoint");
        }

        Err(AppError::Network("all profile endpoints failed".to_string()))
    }

    async fn login(
        &self,
        email: &AccountEmail,
        password: &str,
    ) -> Result<UserProfile, AppError> {
        let payload = json!({ "email": email.as_str(), "password": password });

        for path in LOGIN_PATHS {
            let response = match self
                .client
                .post(self.url(path))
                .timeout(self.request_timeout)
                .json(&payload)
                .send()
                .await
            {
                Ok(response) => response,
                Err(err) => {
                    debug!(path, error = %err, "login failed, trying next endpoint");
                    continue;
                }
            };

            if Self::auth_status(response.status()) {
                return Err(AppError::Auth("invalid credentials".to_string()));
            }
            if !response.status().is_success() {
                debug!(path, status = %response.status(), "unexpected status, trying next endpoint");
                continue;
            }

            let body: Value = match response.json().await {
                Ok(body) => body,
                Err(err) => {
                    debug!(path, error = %err, "unparseable body, trying next endpoint");
                    continue;
                }
            };

            if let Some(profile) = parse_profile(&body) {
                return Ok(profile);
            }
            warn!(path, "login succeeded but no profile in response, trying next endpoint");
        }

        Err(AppError::Network("all login endpoints failed".to_string()))
    }

    async fn check_updates_since(
        &self,
        email: &AccountEmail,
        since: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        for path in UPDATES_PATHS {
            let response = match self
                .client
                .get(self.url(path))
                .query(&[("email", email.as_str()), ("since", &since.to_rfc3339())])
                .timeout(self.request_timeout)
                .send()
                .await
            {
                Ok(response) => response,
                Err(_) => continue,
            };

            if Self::auth_status(response.status()) {
                return Err(AppError::Auth(format!(
                    "update check rejected with {}",
                    response.status()
                )));
            }
            if !response.status().is_success() {
                continue;
            }

            if let Ok(body) = response.json::<Value>().await {
                if let Some(flag) = parse_updates_flag(&body) {
                    return Ok(flag);
                }
            }
        }

        Err(AppError::Network("all update-check endpoints failed".to_string()))
    }

    async fn notify_change(
        &self,
        email: &AccountEmail,
        device_id: &str,
    ) -> Result<(), AppError> {
        let payload = json!({
            "email": email.as_str(),
            "deviceId": device_id,
            "timestamp": Utc::now().to_rfc3339(),
        });

        for path in NOTIFY_PATHS {
            let response = match self
                .client
                .post(self.url(path))
                .timeout(self.request_timeout)
                .json(&payload)
                .send()
                .await
            {
                Ok(response) => response,
                Err(_) => continue,
            };

            if response.status().is_success() {
                return Ok(());
            }
        }

        Err(AppError::Network("all notify endpoints failed".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_profile_from_known_envelopes() {
        let inner = json!({"email": "a@x.com", "name": "Ann"});

        for envelope in ["user", "profile", "data"] {
            let body = json!({ envelope: inner.clone() });
            let profile = parse_profile(&body).unwrap();
            assert_eq!(profile.email.as_str(), "a@x.com");
            assert_eq!(profile.name.as_deref(), Some("Ann"));
        }
    }

    #[test]
    fn test_extracts_bare_profile_object() {
        let body = json!({"email": "a@x.com", "age": 70});
        let profile = parse_profile(&body).unwrap();
        assert_eq!(profile.age, Some(70));
    }

    #[test]
    fn test_envelope_takes_priority_over_bare_shape() {
        let body = json!({
            "email": "wrapper@x.com",
            "user": {"email": "inner@x.com"}
        });
        let profile = parse_profile(&body).unwrap();
        assert_eq!(profile.email.as_str(), "inner@x.com");
    }

    #[test]
    fn test_unrecognized_body_yields_no_profile() {
        assert!(parse_profile(&json!({"status": "ok"})).is_none());
        assert!(parse_profile(&json!({"user": null})).is_none());
        assert!(parse_profile(&json!([1, 2, 3])).is_none());
    }

    #[test]
    fn test_profile_email_is_normalized_on_parse() {
        let body = json!({"user": {"email": " A@X.COM "}});
        let profile = parse_profile(&body).unwrap();
        assert_eq!(profile.email.as_str(), "a@x.com");
    }

    #[test]
    fn test_updates_flag_shapes() {
        assert_eq!(parse_updates_flag(&json!({"hasUpdates": true})), Some(true));
        assert_eq!(parse_updates_flag(&json!({"updates": false})), Some(false));
        assert_eq!(
            parse_updates_flag(&json!({"data": {"hasUpdates": true}})),
            Some(true)
        );
        assert_eq!(parse_updates_flag(&json!({"status": "ok"})), None);
    }
}
