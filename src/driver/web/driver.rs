//! Browser driver using Playwright
//!
//! Locators are translated to Playwright selectors; the element handle id is
//! the selector itself so every action re-resolves it on the live page.

use anyhow::{Context, Result};
use async_trait::async_trait;
use playwright::api::{Browser, BrowserContext, Page, Viewport};
use playwright::Playwright;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::driver::traits::{
    AutomationDriver, DriverError, ElementAction, ElementHandle, Locator, Session,
};

/// Browser configuration
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Upper bound for a single click/fill/wait
    pub action_timeout_ms: u64,
    /// Prefix for relative URLs passed to `navigate`
    pub base_url: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1920,
            viewport_height: 1080,
            action_timeout_ms: 10_000,
            base_url: None,
        }
    }
}

/// Chromium browser session
pub struct BrowserDriver {
    #[allow(dead_code)]
    playwright: Playwright,
    browser: Browser,
    #[allow(dead_code)]
    context: BrowserContext,
    page: Mutex<Page>,
    config: BrowserConfig,
}

impl BrowserDriver {
    /// Launch Chromium and open one page
    pub async fn launch(config: BrowserConfig) -> Result<Self> {
        let playwright = Playwright::initialize()
            .await
            .context("Failed to initialize Playwright")?;

        let chromium = playwright.chromium();
        let mut launcher = chromium.launcher().headless(config.headless);

        let executable = std::env::var("PLAYWRIGHT_CHROMIUM_EXECUTABLE_PATH")
            .ok()
            .map(std::path::PathBuf::from);
        if let Some(ref path) = executable {
            log::info!("Using browser from env: {}", path.display());
            launcher = launcher.executable(path);
        }

        let args: Vec<String> = [
            "--no-sandbox",
            "--disable-setuid-sandbox",
            "--disable-dev-shm-usage",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        launcher = launcher.args(&args);

        let browser = launcher.launch().await.context("Failed to launch Chromium")?;
        let context = browser
            .context_builder()
            .build()
            .await
            .context("Failed to create browser context")?;
        let page = context.new_page().await.context("Failed to open page")?;

        page.set_viewport_size(Viewport {
            width: config.viewport_width as i32,
            height: config.viewport_height as i32,
        })
        .await?;

        log::info!(
            "Chromium launched (headless: {}, viewport {}x{})",
            config.headless,
            config.viewport_width,
            config.viewport_height
        );

        Ok(Self {
            playwright,
            browser,
            context,
            page: Mutex::new(page),
            config,
        })
    }

    fn timeout(&self) -> f64 {
        self.config.action_timeout_ms as f64
    }

    fn full_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else if let Some(ref base) = self.config.base_url {
            format!("{}/{}", base.trim_end_matches('/'), url.trim_start_matches('/'))
        } else {
            url.to_string()
        }
    }
}

/// Convert a locator to a Playwright selector
pub fn to_playwright_selector(locator: &Locator) -> String {
    match locator {
        Locator::AccessibilityId(label) => format!("[aria-label=\"{}\"]", label),
        Locator::XPath(xpath) => format!("xpath={}", xpath),
        Locator::Id(id) => format!("#{}", id),
        Locator::Css(css) => css.clone(),
    }
}

/// Script that makes alert/confirm/prompt return immediately
const DISMISS_DIALOGS_JS: &str =
    "() => { window.alert = () => {}; window.confirm = () => true; window.prompt = () => ''; }";

const TEXT_JS: &str = "el => el.value || el.innerText || el.textContent || ''";

const ATTRIBUTE_JS: &str = "(el, name) => el.getAttribute(name) || ''";

#[async_trait]
impl Session for BrowserDriver {
    async fn close(&self) -> Result<()> {
        log::info!("Closing browser");
        self.browser.close().await?;
        Ok(())
    }
}

#[async_trait]
impl AutomationDriver for BrowserDriver {
    fn platform_name(&self) -> &str {
        "web"
    }

    async fn find_element(&self, locator: &Locator) -> Result<ElementHandle> {
        let page = self.page.lock().await;
        let sel = to_playwright_selector(locator);

        let found = page
            .wait_for_selector_builder(&sel)
            .timeout(self.timeout())
            .wait_for_selector()
            .await;

        match found {
            Ok(Some(_)) => Ok(ElementHandle {
                id: sel,
                locator: locator.clone(),
            }),
            Ok(None) | Err(_) => Err(DriverError::NoSuchElement(locator.to_string()).into()),
        }
    }

    async fn act(&self, element: &ElementHandle, action: ElementAction) -> Result<Value> {
        let page = self.page.lock().await;
        let sel = element.id.as_str();

        match action {
            ElementAction::Click => {
                page.click_builder(sel)
                    .timeout(self.timeout())
                    .click()
                    .await
                    .with_context(|| format!("Failed to click {}", element.locator))?;
                Ok(Value::Null)
            }
            ElementAction::SetValue(text) => {
                page.fill_builder(sel, &text)
                    .timeout(self.timeout())
                    .fill()
                    .await
                    .with_context(|| format!("Failed to fill {}", element.locator))?;
                Ok(Value::Null)
            }
            ElementAction::GetText => {
                let text = page
                    .evaluate_on_selector::<String, String>(sel, TEXT_JS, None::<String>)
                    .await
                    .with_context(|| format!("Failed to read text of {}", element.locator))?;
                Ok(Value::String(text))
            }
            ElementAction::GetAttribute(name) => {
                let value = page
                    .evaluate_on_selector::<String, String>(sel, ATTRIBUTE_JS, Some(name))
                    .await
                    .with_context(|| format!("Failed to read attribute of {}", element.locator))?;
                Ok(Value::String(value))
            }
            ElementAction::IsDisplayed => {
                let visible = match page.query_selector(sel).await? {
                    Some(el) => el.is_visible().await?,
                    None => false,
                };
                Ok(Value::Bool(visible))
            }
        }
    }

    async fn capture_image(&self) -> Result<Vec<u8>> {
        let page = self.page.lock().await;
        let bytes = page
            .screenshot_builder()
            .r#type(playwright::api::ScreenshotType::Png)
            .screenshot()
            .await
            .context("Failed to take screenshot")?;
        Ok(bytes)
    }

    async fn window_size(&self) -> Result<(u32, u32)> {
        Ok((self.config.viewport_width, self.config.viewport_height))
    }

    async fn swipe(&self, from: (i32, i32), to: (i32, i32), duration_ms: u64) -> Result<()> {
        let page = self.page.lock().await;
        page.mouse.r#move(from.0 as f64, from.1 as f64, None).await?;
        page.mouse.down(None, None).await?;
        tokio::time::sleep(Duration::from_millis(duration_ms)).await;
        page.mouse.r#move(to.0 as f64, to.1 as f64, None).await?;
        page.mouse.up(None, None).await?;
        Ok(())
    }

    async fn back(&self) -> Result<()> {
        let page = self.page.lock().await;
        page.evaluate::<(), ()>("window.history.back()", ()).await?;
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        let page = self.page.lock().await;
        let full_url = self.full_url(url);
        log::debug!("goto {}", full_url);
        page.goto_builder(&full_url)
            .goto()
            .await
            .with_context(|| format!("Failed to navigate to {}", full_url))?;
        Ok(())
    }

    async fn dismiss_dialogs(&self) -> Result<()> {
        let page = self.page.lock().await;
        page.evaluate::<(), ()>(DISMISS_DIALOGS_JS, ()).await?;
        Ok(())
    }

    async fn wait_for(&self, locator: &Locator, timeout_ms: u64) -> Result<ElementHandle> {
        let page = self.page.lock().await;
        let sel = to_playwright_selector(locator);

        let found = page
            .wait_for_selector_builder(&sel)
            .timeout(timeout_ms as f64)
            .wait_for_selector()
            .await;

        match found {
            Ok(Some(_)) => Ok(ElementHandle {
                id: sel,
                locator: locator.clone(),
            }),
            _ => Err(DriverError::Timeout {
                locator: locator.to_string(),
                timeout_ms,
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_conversion() {
        assert_eq!(
            to_playwright_selector(&Locator::parse("~Add to cart")),
            "[aria-label=\"Add to cart\"]"
        );
        assert_eq!(
            to_playwright_selector(&Locator::parse("//tr[@class='success']")),
            "xpath=//tr[@class='success']"
        );
        assert_eq!(to_playwright_selector(&Locator::parse("id=cartur")), "#cartur");
        assert_eq!(
            to_playwright_selector(&Locator::parse(".card-title >> nth=0")),
            ".card-title >> nth=0"
        );
    }

    #[test]
    fn test_default_config_matches_desktop_viewport() {
        let config = BrowserConfig::default();
        assert_eq!((config.viewport_width, config.viewport_height), (1920, 1080));
        assert_eq!(config.action_timeout_ms, 10_000);
    }
}
