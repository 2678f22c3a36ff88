use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::time::{Duration, Instant};

/// Element locator, parsed from the string forms used in test code
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// `~name`: accessibility id (content-desc on Android, aria-label on web)
    AccessibilityId(String),
    /// `//...` or `(//...)[n]`
    XPath(String),
    /// `id=...`: platform resource id
    Id(String),
    /// Anything else is handed to the driver as a CSS selector
    Css(String),
}

impl Locator {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(id) = raw.strip_prefix('~') {
            Locator::AccessibilityId(id.to_string())
        } else if raw.starts_with("//") || raw.starts_with("(//") {
            Locator::XPath(raw.to_string())
        } else if let Some(id) = raw.strip_prefix("id=") {
            Locator::Id(id.to_string())
        } else {
            Locator::Css(raw.to_string())
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::AccessibilityId(id) => write!(f, "~{}", id),
            Locator::XPath(xpath) => f.write_str(xpath),
            Locator::Id(id) => write!(f, "id={}", id),
            Locator::Css(css) => f.write_str(css),
        }
    }
}

impl From<&str> for Locator {
    fn from(raw: &str) -> Self {
        Locator::parse(raw)
    }
}

/// Opaque reference to a located element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    /// Driver-specific id (WebDriver element id, Playwright selector)
    pub id: String,
    /// Locator the element was found with
    pub locator: Locator,
}

/// Interaction performed on a located element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementAction {
    Click,
    SetValue(String),
    GetText,
    GetAttribute(String),
    IsDisplayed,
}

/// Typed failures reported by automation collaborators
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("Element not found: {0}")]
    NoSuchElement(String),

    #[error("Timed out after {timeout_ms}ms waiting for {locator}")]
    Timeout { locator: String, timeout_ms: u64 },

    #[error("{command} failed: {error}: {message}")]
    Command {
        command: String,
        error: String,
        message: String,
    },

    #[error("{0} is not supported by the {1} driver")]
    Unsupported(&'static str, &'static str),
}

/// A collaborator session acquired once per run
#[async_trait]
pub trait Session: Send + Sync {
    /// Release the underlying session. Called once after the last case.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Device or browser automation interface
///
/// Implemented by the Appium (mobile) and Playwright (web) drivers so that test
/// flows only depend on locating elements, acting on them and capturing the
/// screen.
#[async_trait]
pub trait AutomationDriver: Session {
    /// Get the platform name (e.g., "android", "web")
    fn platform_name(&self) -> &str;

    /// Locate a single element
    async fn find_element(&self, locator: &Locator) -> Result<ElementHandle>;

    /// Perform an action on an element.
    ///
    /// # Returns
    /// `Value::Null` for click/setValue, a string for text and attribute
    /// reads, a bool for `IsDisplayed`
    async fn act(&self, element: &ElementHandle, action: ElementAction) -> Result<Value>;

    /// Capture the current screen as PNG bytes
    async fn capture_image(&self) -> Result<Vec<u8>>;

    /// Get the viewport size
    ///
    /// # Returns
    /// Tuple of (width, height) in pixels
    async fn window_size(&self) -> Result<(u32, u32)>;

    /// Press-move-release gesture between two points
    async fn swipe(&self, from: (i32, i32), to: (i32, i32), duration_ms: u64) -> Result<()>;

    /// Navigate back
    async fn back(&self) -> Result<()>;

    /// Open a URL
    async fn navigate(&self, _url: &str) -> Result<()> {
        Err(DriverError::Unsupported("navigate", "this").into())
    }

    /// Make native dialogs (alert/confirm) resolve without user input
    async fn dismiss_dialogs(&self) -> Result<()> {
        Ok(())
    }

    /// Wait until an element can be located
    async fn wait_for(&self, locator: &Locator, timeout_ms: u64) -> Result<ElementHandle> {
        let start = Instant::now();
        loop {
            match self.find_element(locator).await {
                Ok(handle) => return Ok(handle),
                Err(e) if start.elapsed() >= Duration::from_millis(timeout_ms) => {
                    log::debug!("wait_for {} gave up: {:#}", locator, e);
                    return Err(DriverError::Timeout {
                        locator: locator.to_string(),
                        timeout_ms,
                    }
                    .into());
                }
                Err(_) => tokio::time::sleep(Duration::from_millis(250)).await,
            }
        }
    }

    async fn click(&self, locator: &str) -> Result<()> {
        let element = self.find_element(&Locator::parse(locator)).await?;
        self.act(&element, ElementAction::Click).await?;
        Ok(())
    }

    async fn set_value(&self, locator: &str, value: &str) -> Result<()> {
        let element = self.find_element(&Locator::parse(locator)).await?;
        self.act(&element, ElementAction::SetValue(value.to_string()))
            .await?;
        Ok(())
    }

    async fn text(&self, locator: &str) -> Result<String> {
        let element = self.find_element(&Locator::parse(locator)).await?;
        let value = self.act(&element, ElementAction::GetText).await?;
        Ok(value_to_string(value))
    }

    async fn attribute(&self, locator: &str, name: &str) -> Result<String> {
        let element = self.find_element(&Locator::parse(locator)).await?;
        let value = self
            .act(&element, ElementAction::GetAttribute(name.to_string()))
            .await?;
        Ok(value_to_string(value))
    }

    /// Check whether an element is displayed; a missing element counts as not displayed
    async fn is_displayed(&self, locator: &str) -> Result<bool> {
        let element = match self.find_element(&Locator::parse(locator)).await {
            Ok(element) => element,
            Err(e) if is_no_such_element(&e) => return Ok(false),
            Err(e) => return Err(e),
        };
        let value = self.act(&element, ElementAction::IsDisplayed).await?;
        Ok(value.as_bool().unwrap_or(false))
    }
}

/// Render a driver return value as plain text (`null` becomes empty)
pub fn value_to_string(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

pub fn is_no_such_element(error: &anyhow::Error) -> bool {
    matches!(
        error.downcast_ref::<DriverError>(),
        Some(DriverError::NoSuchElement(_))
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_locator_parse() {
        assert_eq!(
            Locator::parse("~input-email"),
            Locator::AccessibilityId("input-email".to_string())
        );
        assert_eq!(
            Locator::parse("//android.widget.TextView[contains(@text, \"Success\")]"),
            Locator::XPath("//android.widget.TextView[contains(@text, \"Success\")]".to_string())
        );
        assert_eq!(
            Locator::parse("(//*[@id=\"a\"])[2]"),
            Locator::XPath("(//*[@id=\"a\"])[2]".to_string())
        );
        assert_eq!(Locator::parse("id=switch"), Locator::Id("switch".to_string()));
        assert_eq!(Locator::parse("#cartur"), Locator::Css("#cartur".to_string()));
    }

    #[test]
    fn test_locator_display_round_trips_prefix() {
        assert_eq!(Locator::parse("~Login").to_string(), "~Login");
        assert_eq!(Locator::parse("id=x").to_string(), "id=x");
    }

    #[test]
    fn test_value_to_string() {
        assert_eq!(value_to_string(Value::Null), "");
        assert_eq!(value_to_string(json!("true")), "true");
        assert_eq!(value_to_string(json!(true)), "true");
    }

    #[test]
    fn test_no_such_element_detection() {
        let err: anyhow::Error = DriverError::NoSuchElement("~Login".to_string()).into();
        assert!(is_no_such_element(&err));
        let other: anyhow::Error = anyhow::anyhow!("socket closed");
        assert!(!is_no_such_element(&other));
    }
}
