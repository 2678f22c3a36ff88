//! Appium HTTP Client
//!
//! Drives an Android app through an Appium server using the W3C WebDriver
//! protocol. One session is opened per run and deleted on close.

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::traits::{AutomationDriver, DriverError, ElementAction, ElementHandle, Locator, Session};

/// W3C element reference key
pub const W3C_ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// JSON-wire element reference key, still sent by older servers
const LEGACY_ELEMENT_KEY: &str = "ELEMENT";

/// Appium client bound to one WebDriver session
pub struct AppiumDriver {
    /// Server URL (e.g., "http://localhost:4723/wd/hub")
    base_url: String,
    /// HTTP client
    client: reqwest::Client,
    /// Session id returned by `POST /session`
    session_id: String,
}

/// New session response (W3C puts the id under `value`, older servers at the top level)
#[derive(Debug, Deserialize)]
struct SessionResponse {
    #[serde(default)]
    value: Option<SessionValue>,
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SessionValue {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

/// Window rectangle
#[derive(Debug, Deserialize)]
struct WindowRect {
    width: f64,
    height: f64,
}

impl AppiumDriver {
    /// Open a new session with the given capabilities
    pub async fn connect(server_url: &str, capabilities: &Value, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        let base_url = server_url.trim_end_matches('/').to_string();

        let body = json!({
            "capabilities": {
                "alwaysMatch": capabilities,
                "firstMatch": [{}]
            }
        });

        log::debug!("POST {}/session", base_url);
        let resp = client
            .post(format!("{}/session", base_url))
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to reach Appium server at {}", base_url))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .context("Failed to read session response")?;
        if !status.is_success() {
            return Err(command_error("newSession", &text).into());
        }

        let session: SessionResponse =
            serde_json::from_str(&text).context("Failed to parse session response")?;
        let session_id = session
            .value
            .and_then(|v| v.session_id)
            .or(session.session_id)
            .context("Session response did not contain a session id")?;

        log::info!("Appium session {} created", session_id);
        Ok(Self {
            base_url,
            client,
            session_id,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn session_url(&self, path: &str) -> String {
        format!("{}/session/{}{}", self.base_url, self.session_id, path)
    }

    /// Send a session command and return its `value`
    async fn command(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<Value>,
        name: &str,
    ) -> Result<Value> {
        let url = self.session_url(path);
        log::debug!("{} {}", method, url);

        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let resp = request
            .send()
            .await
            .with_context(|| format!("Failed to send {}", name))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .with_context(|| format!("Failed to read {} response", name))?;
        if !status.is_success() {
            return Err(command_error(name, &text).into());
        }

        let payload: Value = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse {} response", name))?
        };
        Ok(payload.get("value").cloned().unwrap_or(Value::Null))
    }

    async fn element_command(
        &self,
        method: reqwest::Method,
        element: &ElementHandle,
        suffix: &str,
        body: Option<Value>,
        name: &str,
    ) -> Result<Value> {
        let path = format!("/element/{}{}", element.id, suffix);
        self.command(method, &path, body, name)
            .await
            .with_context(|| format!("{} on {}", name, element.locator))
    }
}

/// Locator strategy name used by `POST /element`
pub fn strategy(locator: &Locator) -> (&'static str, &str) {
    match locator {
        Locator::AccessibilityId(v) => ("accessibility id", v),
        Locator::XPath(v) => ("xpath", v),
        Locator::Id(v) => ("id", v),
        Locator::Css(v) => ("css selector", v),
    }
}

/// Read an element id out of a find-element `value`
pub fn element_id(value: &Value) -> Option<String> {
    value
        .get(W3C_ELEMENT_KEY)
        .or_else(|| value.get(LEGACY_ELEMENT_KEY))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

/// Map a WebDriver error payload (`{"value":{"error","message"}}`) to a `DriverError`
pub fn command_error(command: &str, body: &str) -> DriverError {
    let payload: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let value = payload.get("value").unwrap_or(&Value::Null);
    let error = value
        .get("error")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown error")
        .to_string();
    let message = value
        .get("message")
        .and_then(|v| v.as_str())
        .map(|s| s.lines().next().unwrap_or_default().to_string())
        .unwrap_or_else(|| body.trim().to_string());

    if error == "no such element" {
        DriverError::NoSuchElement(message)
    } else {
        DriverError::Command {
            command: command.to_string(),
            error,
            message,
        }
    }
}

/// W3C pointer action sequence for a single-finger swipe
pub fn swipe_actions(from: (i32, i32), to: (i32, i32), duration_ms: u64) -> Value {
    json!({
        "actions": [{
            "type": "pointer",
            "id": "finger1",
            "parameters": { "pointerType": "touch" },
            "actions": [
                { "type": "pointerMove", "duration": 0, "x": from.0, "y": from.1 },
                { "type": "pointerDown", "button": 0 },
                { "type": "pause", "duration": duration_ms },
                { "type": "pointerMove", "duration": 100, "origin": "viewport", "x": to.0, "y": to.1 },
                { "type": "pointerUp", "button": 0 }
            ]
        }]
    })
}

#[async_trait]
impl Session for AppiumDriver {
    async fn close(&self) -> Result<()> {
        log::info!("Closing Appium session {}", self.session_id);
        self.command(reqwest::Method::DELETE, "", None, "deleteSession")
            .await?;
        Ok(())
    }
}

#[async_trait]
impl AutomationDriver for AppiumDriver {
    fn platform_name(&self) -> &str {
        "android"
    }

    async fn find_element(&self, locator: &Locator) -> Result<ElementHandle> {
        let (using, value) = strategy(locator);
        let found = self
            .command(
                reqwest::Method::POST,
                "/element",
                Some(json!({ "using": using, "value": value })),
                "findElement",
            )
            .await
            .map_err(|e| -> anyhow::Error {
                match e.downcast::<DriverError>() {
                    Ok(DriverError::NoSuchElement(_)) => {
                        DriverError::NoSuchElement(locator.to_string()).into()
                    }
                    Ok(other) => other.into(),
                    Err(e) => e,
                }
            })?;

        let id = element_id(&found)
            .with_context(|| format!("No element id in response for {}", locator))?;
        Ok(ElementHandle {
            id,
            locator: locator.clone(),
        })
    }

    async fn act(&self, element: &ElementHandle, action: ElementAction) -> Result<Value> {
        use reqwest::Method;

        match action {
            ElementAction::Click => {
                self.element_command(Method::POST, element, "/click", Some(json!({})), "click")
                    .await?;
                Ok(Value::Null)
            }
            ElementAction::SetValue(text) => {
                self.element_command(Method::POST, element, "/clear", Some(json!({})), "clear")
                    .await?;
                self.element_command(
                    Method::POST,
                    element,
                    "/value",
                    Some(json!({ "text": text })),
                    "setValue",
                )
                .await?;
                Ok(Value::Null)
            }
            ElementAction::GetText => {
                self.element_command(Method::GET, element, "/text", None, "getText")
                    .await
            }
            ElementAction::GetAttribute(name) => {
                let suffix = format!("/attribute/{}", name);
                self.element_command(Method::GET, element, &suffix, None, "getAttribute")
                    .await
            }
            ElementAction::IsDisplayed => {
                self.element_command(Method::GET, element, "/displayed", None, "isDisplayed")
                    .await
            }
        }
    }

    async fn capture_image(&self) -> Result<Vec<u8>> {
        let value = self
            .command(reqwest::Method::GET, "/screenshot", None, "takeScreenshot")
            .await?;
        let encoded = value
            .as_str()
            .context("Screenshot response was not a base64 string")?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .context("Failed to decode screenshot")
    }

    async fn window_size(&self) -> Result<(u32, u32)> {
        let value = self
            .command(reqwest::Method::GET, "/window/rect", None, "getWindowRect")
            .await?;
        let rect: WindowRect =
            serde_json::from_value(value).context("Failed to parse window rect")?;
        Ok((rect.width as u32, rect.height as u32))
    }

    async fn swipe(&self, from: (i32, i32), to: (i32, i32), duration_ms: u64) -> Result<()> {
        self.command(
            reqwest::Method::POST,
            "/actions",
            Some(swipe_actions(from, to, duration_ms)),
            "performActions",
        )
        .await?;
        self.command(reqwest::Method::DELETE, "/actions", None, "releaseActions")
            .await?;
        Ok(())
    }

    async fn back(&self) -> Result<()> {
        self.command(reqwest::Method::POST, "/back", Some(json!({})), "back")
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::traits::is_no_such_element;
    use httpmock::prelude::*;

    async fn connected(server: &MockServer) -> AppiumDriver {
        server.mock(|when, then| {
            when.method(POST).path("/wd/hub/session");
            then.status(200)
                .json_body(json!({"value": {"sessionId": "s1", "capabilities": {}}}));
        });
        AppiumDriver::connect(
            &server.url("/wd/hub"),
            &json!({"platformName": "Android"}),
            Duration::from_secs(5),
        )
        .await
        .expect("session")
    }

    #[test]
    fn test_strategy_mapping() {
        assert_eq!(
            strategy(&Locator::parse("~Login")),
            ("accessibility id", "Login")
        );
        assert_eq!(strategy(&Locator::parse("//a")), ("xpath", "//a"));
        assert_eq!(strategy(&Locator::parse("id=switch")), ("id", "switch"));
        assert_eq!(strategy(&Locator::parse(".card")), ("css selector", ".card"));
    }

    #[test]
    fn test_element_id_keys() {
        assert_eq!(
            element_id(&json!({ W3C_ELEMENT_KEY: "abc" })).as_deref(),
            Some("abc")
        );
        assert_eq!(element_id(&json!({"ELEMENT": "old"})).as_deref(), Some("old"));
        assert_eq!(element_id(&json!({})), None);
    }

    #[test]
    fn test_command_error_mapping() {
        let body = r#"{"value":{"error":"no such element","message":"An element could not be located\nstack"}}"#;
        assert!(matches!(
            command_error("findElement", body),
            DriverError::NoSuchElement(_)
        ));

        let body = r#"{"value":{"error":"invalid session id","message":"gone"}}"#;
        assert_eq!(
            command_error("click", body).to_string(),
            "click failed: invalid session id: gone"
        );
    }

    #[test]
    fn test_swipe_actions_shape() {
        let actions = swipe_actions((864, 1200), (216, 1200), 500);
        let steps = actions["actions"][0]["actions"].as_array().unwrap();
        assert_eq!(steps.len(), 5);
        assert_eq!(steps[0]["x"], 864);
        assert_eq!(steps[2]["duration"], 500);
        assert_eq!(steps[3]["x"], 216);
        assert_eq!(actions["actions"][0]["parameters"]["pointerType"], "touch");
    }

    #[tokio::test]
    async fn test_connect_reads_w3c_session_id() {
        let server = MockServer::start();
        let driver = connected(&server).await;
        assert_eq!(driver.session_id(), "s1");
    }

    #[tokio::test]
    async fn test_connect_failure_is_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/wd/hub/session");
            then.status(500).json_body(
                json!({"value": {"error": "session not created", "message": "no device"}}),
            );
        });

        let err = AppiumDriver::connect(&server.url("/wd/hub"), &json!({}), Duration::from_secs(5))
            .await
            .err()
            .expect("connect should fail");
        assert!(format!("{:#}", err).contains("session not created"));
    }

    #[tokio::test]
    async fn test_click_by_accessibility_id() {
        let server = MockServer::start();
        let driver = connected(&server).await;
        let find = server.mock(|when, then| {
            when.method(POST)
                .path("/wd/hub/session/s1/element")
                .json_body(json!({"using": "accessibility id", "value": "Login"}));
            then.status(200).json_body(json!({"value": { W3C_ELEMENT_KEY: "e1" }}));
        });
        let click = server.mock(|when, then| {
            when.method(POST).path("/wd/hub/session/s1/element/e1/click");
            then.status(200).json_body(json!({"value": null}));
        });

        driver.click("~Login").await.expect("click");
        find.assert();
        click.assert();
    }

    #[tokio::test]
    async fn test_missing_element_maps_to_no_such_element() {
        let server = MockServer::start();
        let driver = connected(&server).await;
        server.mock(|when, then| {
            when.method(POST).path("/wd/hub/session/s1/element");
            then.status(404).json_body(
                json!({"value": {"error": "no such element", "message": "not found"}}),
            );
        });

        let err = driver
            .find_element(&Locator::parse("~Missing"))
            .await
            .unwrap_err();
        assert!(is_no_such_element(&err));
        assert!(!driver.is_displayed("~Missing").await.expect("displayed"));
    }

    #[tokio::test]
    async fn test_screenshot_is_decoded() {
        let server = MockServer::start();
        let driver = connected(&server).await;
        server.mock(|when, then| {
            when.method(GET).path("/wd/hub/session/s1/screenshot");
            then.status(200).json_body(json!({"value": "iVBORw=="}));
        });

        let png = driver.capture_image().await.expect("screenshot");
        assert_eq!(&png[..3], &[0x89, b'P', b'N']);
    }

    #[tokio::test]
    async fn test_window_size_and_close() {
        let server = MockServer::start();
        let driver = connected(&server).await;
        server.mock(|when, then| {
            when.method(GET).path("/wd/hub/session/s1/window/rect");
            then.status(200)
                .json_body(json!({"value": {"x": 0, "y": 0, "width": 1080.0, "height": 2400.0}}));
        });
        let delete = server.mock(|when, then| {
            when.method(DELETE).path("/wd/hub/session/s1");
            then.status(200).json_body(json!({"value": null}));
        });

        assert_eq!(driver.window_size().await.expect("rect"), (1080, 2400));
        driver.close().await.expect("close");
        delete.assert();
    }
}
