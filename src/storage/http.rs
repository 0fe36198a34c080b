use std::sync::RwLock;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};

use crate::{appsettings::ApiSettings, error::StorageError};

use super::model::{AuthResponse, LoginRequest};

const LOGIN_PATH: &str = "auth/login/";

/// HTTP client for the wellness backend, carrying the session token.
#[derive(Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl ApiClient {
    pub fn new(settings: &ApiSettings) -> Result<Self, StorageError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            token: RwLock::new(settings.token.clone().filter(|token| !token.is_empty())),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn has_token(&self) -> bool {
        self.token.read().map(|token| token.is_some()).unwrap_or(false)
    }

    /// Exchanges credentials for a session token and keeps it for later requests.
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthResponse, StorageError> {
        let request = self
            .client
            .post(self.url(LOGIN_PATH))
            .json(&LoginRequest { username, password });
        let response: AuthResponse = self.execute(request).await?.json().await?;

        if let Ok(mut token) = self.token.write() {
            *token = Some(response.token.clone());
        }
        log::info!("Logged in as user {}", response.id);

        Ok(response)
    }

    /// Builds a request with the `Authorization: Token <value>` header when a session exists.
    pub fn build_request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self.client.request(method, self.url(path));
        let token = self.token.read().ok().and_then(|token| token.clone());

        match token {
            Some(token) => request.header("Authorization", format!("Token {token}")),
            None => request,
        }
    }

    pub async fn execute(&self, request: RequestBuilder) -> Result<Response, StorageError> {
        let response = request.send().await?;

        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(StorageError::Unauthorized),
            status => {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unable to read response".to_string());
                log::error!("Backend error {status}: {body}");
                Err(StorageError::Status {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}
