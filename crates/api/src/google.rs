//! Google OAuth 2.0 web-server flow with offline access for the Business
//! Profile API.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::config::GoogleConfig;

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";
const SCOPES: &str = "openid email profile https://www.googleapis.com/auth/business.manage";

#[derive(Debug, Error)]
pub enum GoogleError {
    #[error("request to Google failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Google rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    #[serde(alias = "access_token")]
    pub access_token: String,
    #[serde(default, alias = "refresh_token", skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, alias = "expires_in", skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, alias = "token_type", skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

/// The OpenID profile of the signed-in account.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GoogleUser {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

pub struct GoogleOAuth {
    client: reqwest::Client,
    config: GoogleConfig,
}

impl GoogleOAuth {
    pub fn new(config: GoogleConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Consent screen URL. `state` is echoed back to the callback.
    pub fn authorize_url(&self, state: &str) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", SCOPES)
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent")
            .append_pair("state", state)
            .finish();
        format!("{AUTH_URL}?{query}")
    }

    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, GoogleError> {
        tracing::debug!("exchanging authorization code");
        self.token_request(&[
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
        ])
        .await
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, GoogleError> {
        tracing::debug!("refreshing Google access token");
        self.token_request(&[
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    pub async fn user_info(&self, access_token: &str) -> Result<GoogleUser, GoogleError> {
        let response = self
            .client
            .get(USERINFO_URL)
            .bearer_auth(access_token)
            .send()
            .await?;
        Ok(checked(response).await?.json().await?)
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> Result<TokenResponse, GoogleError> {
        let response = self.client.post(TOKEN_URL).form(params).send().await?;
        Ok(checked(response).await?.json().await?)
    }
}

async fn checked(response: reqwest::Response) -> Result<reqwest::Response, GoogleError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(GoogleError::Rejected {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    #[test]
    fn authorize_url_requests_offline_business_scope() {
        let oauth = GoogleOAuth::new(crate::config::AppConfig::for_tests().google.unwrap());
        let url = Url::parse(&oauth.authorize_url("abc")).unwrap();
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(url.host_str(), Some("accounts.google.com"));
        assert_eq!(pairs["client_id"], "client-123");
        assert_eq!(pairs["access_type"], "offline");
        assert_eq!(pairs["state"], "abc");
        assert!(pairs["scope"].contains("business.manage"));
    }

    #[test]
    fn token_response_reads_google_field_names() {
        let t: TokenResponse = serde_json::from_str(
            r#"{"access_token":"ya29","expires_in":3599,"token_type":"Bearer","scope":"openid"}"#,
        )
        .unwrap();
        assert_eq!(t.access_token, "ya29");
        assert_eq!(t.expires_in, Some(3599));
        assert_eq!(t.refresh_token, None);

        let out = serde_json::to_value(&t).unwrap();
        assert_eq!(out["accessToken"], "ya29");
        assert!(out.get("refreshToken").is_none());
    }
}
