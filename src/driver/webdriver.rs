//! W3C WebDriver client
//!
//! Speaks the WebDriver JSON protocol over HTTP to chromedriver,
//! geckodriver or a Selenium server. Only the handful of endpoints the
//! harness needs are implemented.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use std::time::Duration;

use crate::common::config::{BrowserKind, DriverConfig, Timeouts};
use crate::common::{Error, Result};

use super::{Browser, ElementHandle};

/// Key under which W3C element references are returned
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// A WebDriver session
pub struct WebDriver {
    http: reqwest::Client,
    base_url: String,
    session_id: String,
    request_timeout_ms: u64,
}

impl WebDriver {
    /// Create a new session on the WebDriver server
    #[tracing::instrument(skip_all, fields(url = %config.webdriver_url))]
    pub async fn connect(config: &DriverConfig, timeouts: &Timeouts) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .build()?;
        let base_url = config.webdriver_url.trim_end_matches('/').to_string();

        let mut driver = Self {
            http,
            base_url,
            session_id: String::new(),
            request_timeout_ms: timeouts.request_secs * 1000,
        };

        let value = driver
            .request(Method::POST, "/session", Some(capabilities(config)))
            .await?;
        driver.session_id = value["sessionId"]
            .as_str()
            .ok_or_else(|| Error::Driver("New session response has no sessionId".to_string()))?
            .to_string();

        tracing::info!(session = %driver.session_id, browser = ?config.browser, "WebDriver session created");

        // Lookups are polled by the runner, so the driver must not wait on its own
        driver
            .session_request(
                Method::POST,
                "/timeouts",
                Some(json!({ "implicit": 0, "pageLoad": driver.request_timeout_ms })),
            )
            .await?;

        Ok(driver)
    }

    async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("WebDriver {} {}", method, url);

        let mut builder = self.http.request(method, &url);
        if let Some(body) = body {
            builder = builder.json(&body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::timeout(format!("WebDriver response from {}", url), self.request_timeout_ms)
            } else if e.is_connect() {
                Error::Driver(format!(
                    "Cannot reach WebDriver at {}. Is chromedriver/geckodriver running?",
                    self.base_url
                ))
            } else {
                Error::Http(e)
            }
        })?;

        let status = response.status();
        let body: Value = response.json().await?;
        unwrap_value(body, status.is_success(), self.request_timeout_ms)
    }

    async fn session_request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value> {
        let path = format!("/session/{}{}", self.session_id, path);
        self.request(method, &path, body).await
    }
}

/// Capabilities payload for a new session
pub(crate) fn capabilities(config: &DriverConfig) -> Value {
    let always_match = match config.browser {
        BrowserKind::Chrome => {
            let mut args = vec!["--window-size=1280,900"];
            if config.headless {
                args.push("--headless=new");
            }
            json!({ "browserName": "chrome", "goog:chromeOptions": { "args": args } })
        }
        BrowserKind::Firefox => {
            let args: Vec<&str> = if config.headless { vec!["-headless"] } else { vec![] };
            json!({ "browserName": "firefox", "moz:firefoxOptions": { "args": args } })
        }
    };
    json!({ "capabilities": { "alwaysMatch": always_match } })
}

/// Extract `value` from a WebDriver response, mapping protocol errors
pub(crate) fn unwrap_value(mut body: Value, http_ok: bool, timeout_ms: u64) -> Result<Value> {
    let value = body
        .get_mut("value")
        .map(Value::take)
        .unwrap_or(Value::Null);

    if let Some(code) = value.get("error").and_then(Value::as_str) {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        return Err(match code {
            "no such element" | "stale element reference" => Error::ElementNotFound(message),
            "timeout" | "script timeout" => Error::timeout(message, timeout_ms),
            _ => Error::Driver(format!("{}: {}", code, message)),
        });
    }

    if !http_ok {
        return Err(Error::Driver(format!("Unexpected WebDriver response: {}", value)));
    }
    Ok(value)
}

/// Parse one element reference
pub(crate) fn element_ref(value: &Value) -> Result<ElementHandle> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(|id| ElementHandle(id.to_string()))
        .ok_or_else(|| Error::Driver(format!("Not an element reference: {}", value)))
}

/// Parse a list of element references
pub(crate) fn element_refs(value: &Value) -> Result<Vec<ElementHandle>> {
    value
        .as_array()
        .ok_or_else(|| Error::Driver(format!("Expected element list, got {}", value)))?
        .iter()
        .map(element_ref)
        .collect()
}

fn locate(selector: &str) -> Value {
    json!({ "using": "css selector", "value": selector })
}

fn optional_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

#[async_trait]
impl Browser for WebDriver {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.session_request(Method::POST, "/url", Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String> {
        let value = self.session_request(Method::GET, "/url", None).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| Error::Driver(format!("Unexpected URL value: {}", value)))
    }

    async fn find_element(&mut self, selector: &str) -> Result<ElementHandle> {
        let value = self
            .session_request(Method::POST, "/element", Some(locate(selector)))
            .await
            .map_err(|e| match e {
                Error::ElementNotFound(_) => Error::ElementNotFound(selector.to_string()),
                other => other,
            })?;
        element_ref(&value)
    }

    async fn find_elements(&mut self, selector: &str) -> Result<Vec<ElementHandle>> {
        let value = self
            .session_request(Method::POST, "/elements", Some(locate(selector)))
            .await?;
        element_refs(&value)
    }

    async fn find_child(
        &mut self,
        parent: &ElementHandle,
        selector: &str,
    ) -> Result<ElementHandle> {
        let path = format!("/element/{}/element", parent);
        let value = self
            .session_request(Method::POST, &path, Some(locate(selector)))
            .await
            .map_err(|e| match e {
                Error::ElementNotFound(_) => Error::ElementNotFound(selector.to_string()),
                other => other,
            })?;
        element_ref(&value)
    }

    async fn find_children(
        &mut self,
        parent: &ElementHandle,
        selector: &str,
    ) -> Result<Vec<ElementHandle>> {
        let path = format!("/element/{}/elements", parent);
        let value = self
            .session_request(Method::POST, &path, Some(locate(selector)))
            .await?;
        element_refs(&value)
    }

    async fn type_text(&mut self, element: &ElementHandle, text: &str) -> Result<()> {
        let path = format!("/element/{}/value", element);
        self.session_request(Method::POST, &path, Some(json!({ "text": text })))
            .await?;
        Ok(())
    }

    async fn click(&mut self, element: &ElementHandle) -> Result<()> {
        let path = format!("/element/{}/click", element);
        self.session_request(Method::POST, &path, Some(json!({})))
            .await?;
        Ok(())
    }

    async fn text(&mut self, element: &ElementHandle) -> Result<String> {
        let path = format!("/element/{}/text", element);
        let value = self.session_request(Method::GET, &path, None).await?;
        Ok(optional_string(value).unwrap_or_default())
    }

    async fn attribute(&mut self, element: &ElementHandle, name: &str) -> Result<Option<String>> {
        let path = format!("/element/{}/attribute/{}", element, name);
        let value = self.session_request(Method::GET, &path, None).await?;
        Ok(optional_string(value))
    }

    async fn property(&mut self, element: &ElementHandle, name: &str) -> Result<Option<String>> {
        let path = format!("/element/{}/property/{}", element, name);
        let value = self.session_request(Method::GET, &path, None).await?;
        Ok(optional_string(value))
    }

    async fn clear_session(&mut self) -> Result<()> {
        self.session_request(Method::DELETE, "/cookie", None).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if self.session_id.is_empty() {
            return Ok(());
        }
        self.session_request(Method::DELETE, "", None).await?;
        tracing::debug!(session = %self.session_id, "WebDriver session deleted");
        self.session_id.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwrap_success_value() {
        let value = unwrap_value(json!({ "value": "https://x/" }), true, 100).unwrap();
        assert_eq!(value, json!("https://x/"));
    }

    #[test]
    fn test_no_such_element_maps_to_element_not_found() {
        let body = json!({ "value": { "error": "no such element", "message": "gone", "stacktrace": "" } });
        let err = unwrap_value(body, false, 100).unwrap_err();
        assert!(matches!(err, Error::ElementNotFound(m) if m == "gone"));
    }

    #[test]
    fn test_timeout_maps_to_timeout() {
        let body = json!({ "value": { "error": "timeout", "message": "page load" } });
        let err = unwrap_value(body, false, 3000).unwrap_err();
        assert!(matches!(err, Error::Timeout { ms: 3000, .. }));
    }

    #[test]
    fn test_other_errors_are_driver_errors() {
        let body = json!({ "value": { "error": "session not created", "message": "no chrome" } });
        let err = unwrap_value(body, false, 100).unwrap_err();
        assert_eq!(err.to_string(), "Browser driver error: session not created: no chrome");
    }

    #[test]
    fn test_element_refs() {
        let value = json!([{ ELEMENT_KEY: "a" }, { ELEMENT_KEY: "b" }]);
        let handles = element_refs(&value).unwrap();
        assert_eq!(handles, vec![ElementHandle("a".into()), ElementHandle("b".into())]);
        assert!(element_ref(&json!({ "foo": 1 })).is_err());
    }

    #[test]
    fn test_capabilities_headless_flags() {
        let mut config = DriverConfig::default();
        let caps = capabilities(&config);
        let args = &caps["capabilities"]["alwaysMatch"]["goog:chromeOptions"]["args"];
        assert!(args.as_array().unwrap().contains(&json!("--headless=new")));

        config.browser = BrowserKind::Firefox;
        config.headless = false;
        let caps = capabilities(&config);
        assert_eq!(caps["capabilities"]["alwaysMatch"]["browserName"], "firefox");
        assert!(caps["capabilities"]["alwaysMatch"]["moz:firefoxOptions"]["args"]
            .as_array()
            .unwrap()
            .is_empty());
    }
}
