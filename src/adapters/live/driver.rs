//! Live adapter for the `BrowserDriver` port speaking W3C WebDriver over HTTP.

use base64::Engine as _;
use reqwest::{Client, Method};
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::ports::driver::{BrowserDriver, DriverAction, DriverFuture};

/// Key under which WebDriver returns element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Talks to a chromedriver/geckodriver compatible endpoint.
pub struct WebDriverClient {
    client: Client,
    base_url: String,
}

impl WebDriverClient {
    /// Create a client for the endpoint at `base_url` (e.g. `http://localhost:9515`).
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self { client: Client::new(), base_url: base_url.trim_end_matches('/').to_string() }
    }

    fn failed(&self, reason: impl std::fmt::Display) -> Error {
        Error::CaptureFailed { target: self.base_url.clone(), reason: reason.to_string() }
    }

    /// Issue one command and return its `value` member.
    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let url = format!("{}{path}", self.base_url);
        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await.map_err(|e| self.failed(e))?;
        let status = response.status();
        let mut payload: Value = response.json().await.map_err(|e| self.failed(e))?;
        let value = payload.get_mut("value").map(Value::take).unwrap_or(Value::Null);

        if !status.is_success() {
            let message = value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown webdriver error")
                .to_string();
            return Err(self.failed(format!("{path}: {message}")));
        }
        Ok(value)
    }

    async fn find(&self, session: &str, selector: &str) -> Result<String> {
        let value = self
            .command(
                Method::POST,
                &format!("/session/{session}/element"),
                Some(json!({"using": "css selector", "value": selector})),
            )
            .await?;
        value
            .get(ELEMENT_KEY)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| self.failed(format!("no element matches {selector:?}")))
    }

    async fn script_on(&self, session: &str, selector: &str, script: &str) -> Result<()> {
        let element = self.find(session, selector).await?;
        self.command(
            Method::POST,
            &format!("/session/{session}/execute/sync"),
            Some(json!({"script": script, "args": [{ELEMENT_KEY: element}]})),
        )
        .await?;
        Ok(())
    }
}

impl BrowserDriver for WebDriverClient {
    fn is_available(&self) -> DriverFuture<'_, bool> {
        Box::pin(async move {
            match self.command(Method::GET, "/status", None).await {
                Ok(value) => Ok(value.get("ready").and_then(Value::as_bool).unwrap_or(false)),
                Err(err) => {
                    tracing::debug!(endpoint = %self.base_url, error = %err, "webdriver not reachable");
                    Ok(false)
                }
            }
        })
    }

    fn open<'a>(&'a self, url: &'a str, width: u32, height: u32) -> DriverFuture<'a, String> {
        Box::pin(async move {
            let capabilities = json!({
                "capabilities": {
                    "alwaysMatch": {
                        "goog:chromeOptions": {
                            "args": ["--headless=new", format!("--window-size={width},{height}")]
                        }
                    }
                }
            });
            let value = self.command(Method::POST, "/session", Some(capabilities)).await?;
            let session = value
                .get("sessionId")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| self.failed("session response carried no sessionId"))?;

            let navigate = self
                .command(Method::POST, &format!("/session/{session}/url"), Some(json!({"url": url})))
                .await;
            if let Err(err) = navigate {
                let _ = self.command(Method::DELETE, &format!("/session/{session}"), None).await;
                return Err(err);
            }
            Ok(session)
        })
    }

    fn perform<'a>(&'a self, session: &'a str, action: &'a DriverAction) -> DriverFuture<'a, ()> {
        Box::pin(async move {
            match action {
                DriverAction::Navigate(url) => {
                    self.command(
                        Method::POST,
                        &format!("/session/{session}/url"),
                        Some(json!({"url": url})),
                    )
                    .await?;
                }
                DriverAction::Click(selector) => {
                    let element = self.find(session, selector).await?;
                    self.command(
                        Method::POST,
                        &format!("/session/{session}/element/{element}/click"),
                        Some(json!({})),
                    )
                    .await?;
                }
                DriverAction::Input { selector, value } => {
                    let element = self.find(session, selector).await?;
                    self.command(
                        Method::POST,
                        &format!("/session/{session}/element/{element}/value"),
                        Some(json!({"text": value})),
                    )
                    .await?;
                }
                DriverAction::Hover(selector) => {
                    self.script_on(
                        session,
                        selector,
                        "arguments[0].dispatchEvent(new MouseEvent('mouseover', {bubbles: true}));",
                    )
                    .await?;
                }
                DriverAction::Scroll(selector) => {
                    self.script_on(session, selector, "arguments[0].scrollIntoView();").await?;
                }
            }
            Ok(())
        })
    }

    fn screenshot<'a>(&'a self, session: &'a str) -> DriverFuture<'a, Vec<u8>> {
        Box::pin(async move {
            let value =
                self.command(Method::GET, &format!("/session/{session}/screenshot"), None).await?;
            let encoded =
                value.as_str().ok_or_else(|| self.failed("screenshot was not a string"))?;
            base64::engine::general_purpose::STANDARD
                .decode(encoded)
                .map_err(|e| self.failed(format!("screenshot was not base64: {e}")))
        })
    }

    fn close<'a>(&'a self, session: &'a str) -> DriverFuture<'a, ()> {
        Box::pin(async move {
            self.command(Method::DELETE, &format!("/session/{session}"), None).await?;
            Ok(())
        })
    }
}
