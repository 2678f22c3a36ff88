//! Demoblaze purchase flow driven through Playwright

use anyhow::{Context, Result};
use regex::Regex;
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;

use crate::driver::traits::{AutomationDriver, Locator};
use crate::driver::web::{BrowserConfig, BrowserDriver};
use crate::runner::{CaseRecord, RunContext, ScreenshotSink, SuiteRunner, TestCase, Verdict};
use crate::utils::config::WebConfig;

pub const SUITE: &str = "web";

pub type WebCase = TestCase<dyn AutomationDriver>;

/// Artifact stem of the captured order id, `web_order_id_<run-id>.txt`
pub const ORDER_ID_STEM: &str = "order_id";

const CONFIRMATION_TIMEOUT_MS: u64 = 10_000;

const CUSTOMER: [(&str, &str); 6] = [
    ("#name", "Test Customer"),
    ("#country", "Test Country"),
    ("#city", "Test City"),
    ("#card", "4111111111111111"),
    ("#month", "12"),
    ("#year", "2025"),
];

pub async fn connect(config: &WebConfig) -> Result<Box<dyn AutomationDriver>> {
    let driver = BrowserDriver::launch(BrowserConfig {
        headless: config.headless,
        viewport_width: config.viewport_width,
        viewport_height: config.viewport_height,
        action_timeout_ms: config.action_timeout_ms,
        base_url: Some(config.base_url.clone()),
    })
    .await?;
    Ok(Box::new(driver))
}

/// Per-run settings shared by the purchase steps
#[derive(Clone)]
pub struct Shop {
    base_url: String,
    shots: ScreenshotSink,
    order_id_path: PathBuf,
    wait_timeout_ms: u64,
    pace: bool,
}

impl Shop {
    pub fn new(config: &WebConfig, ctx: &RunContext) -> Self {
        Self {
            base_url: config.base_url.clone(),
            shots: ctx.screenshots(),
            order_id_path: ctx.artifact_path(ORDER_ID_STEM, "txt"),
            wait_timeout_ms: config.action_timeout_ms,
            pace: true,
        }
    }

    pub fn without_pauses(mut self) -> Self {
        self.pace = false;
        self
    }

    async fn pause(&self, ms: u64) {
        if self.pace {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }

    async fn wait(&self, driver: &dyn AutomationDriver, selector: &str) -> Result<()> {
        driver
            .wait_for(&Locator::parse(selector), self.wait_timeout_ms)
            .await?;
        Ok(())
    }

    async fn screenshot(
        &self,
        driver: &dyn AutomationDriver,
        record: &mut CaseRecord,
        step: &str,
    ) -> Result<()> {
        let path = self.shots.capture(driver, SUITE, step).await?;
        record.log(format!("📸 Screenshot: {}", path));
        record.attach(path);
        Ok(())
    }
}

/// The seven purchase steps in order; a failure captures an ERROR screenshot
pub fn runner(shop: Shop) -> SuiteRunner<dyn AutomationDriver> {
    let on_error = shop.shots.clone();

    SuiteRunner::new(SUITE)
        .group("Purchase Flow")
        .cases(cases(shop))
        .on_failure(move |driver, name, record| {
            Box::pin(error_screenshot(driver, name, record, on_error.clone()))
        })
}

async fn error_screenshot(
    driver: &dyn AutomationDriver,
    name: &str,
    record: &mut CaseRecord,
    shots: ScreenshotSink,
) -> Result<()> {
    let path = shots.capture(driver, name, "ERROR").await?;
    record.attach(path);
    Ok(())
}

pub fn cases(shop: Shop) -> Vec<WebCase> {
    let (s1, s2, s3, s4, s5, s6, s7) = (
        shop.clone(),
        shop.clone(),
        shop.clone(),
        shop.clone(),
        shop.clone(),
        shop.clone(),
        shop,
    );
    vec![
        WebCase::new(
            "Navigate to home page",
            "Home page loads",
            move |driver, record| Box::pin(navigate_home(driver, record, s1.clone())),
        ),
        WebCase::new(
            "Select first product",
            "Product page opens",
            move |driver, record| Box::pin(select_product(driver, record, s2.clone())),
        ),
        WebCase::new(
            "Add product to cart",
            "Product added, confirmation dialog accepted",
            move |driver, record| Box::pin(add_to_cart(driver, record, s3.clone())),
        ),
        WebCase::new(
            "Verify cart",
            "Cart lists the added product",
            move |driver, record| Box::pin(verify_cart(driver, record, s4.clone())),
        ),
        WebCase::new(
            "Complete checkout",
            "Order form filled and purchase submitted",
            move |driver, record| Box::pin(checkout(driver, record, s5.clone())),
        ),
        WebCase::new(
            "Verify order confirmation",
            "Confirmation dialog is shown",
            move |driver, record| Box::pin(verify_confirmation(driver, record, s6.clone())),
        ),
        WebCase::new(
            "Capture order ID",
            "Order ID is read from the confirmation and saved",
            move |driver, record| Box::pin(capture_order_id(driver, record, s7.clone())),
        ),
    ]
}

/// Pull the numeric order id out of the confirmation text
pub fn extract_order_id(confirmation: &str) -> Option<String> {
    let re = Regex::new(r"Id: (\d+)").ok()?;
    re.captures(confirmation)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

async fn navigate_home(
    driver: &dyn AutomationDriver,
    record: &mut CaseRecord,
    shop: Shop,
) -> Result<Verdict> {
    driver.navigate(&shop.base_url).await?;
    shop.wait(driver, "body").await?;
    shop.screenshot(driver, record, "01_navigation").await?;
    Ok(Verdict::pass(format!("Loaded {}", shop.base_url)))
}

async fn select_product(
    driver: &dyn AutomationDriver,
    record: &mut CaseRecord,
    shop: Shop,
) -> Result<Verdict> {
    let product = driver.text(".card-title >> nth=0").await?;
    driver.click(".card-title >> nth=0").await?;
    shop.wait(driver, "a:has-text(\"Add to cart\")").await?;
    record.detail("product", json!(product.trim()));
    shop.screenshot(driver, record, "02_product_selected").await?;
    Ok(Verdict::pass(format!("Opened product \"{}\"", product.trim())))
}

async fn add_to_cart(
    driver: &dyn AutomationDriver,
    record: &mut CaseRecord,
    shop: Shop,
) -> Result<Verdict> {
    driver.dismiss_dialogs().await?;
    driver.click("a:has-text(\"Add to cart\")").await?;
    shop.pause(2000).await;
    shop.screenshot(driver, record, "03_added_to_cart").await?;
    Ok(Verdict::pass("Product added to cart"))
}

async fn verify_cart(
    driver: &dyn AutomationDriver,
    record: &mut CaseRecord,
    shop: Shop,
) -> Result<Verdict> {
    driver.click("#cartur").await?;
    shop.wait(driver, "tr.success").await?;
    let row = driver.text("tr.success").await?;
    shop.screenshot(driver, record, "04_cart_verified").await?;
    Ok(Verdict::pass(format!(
        "Cart row: {}",
        row.split_whitespace().collect::<Vec<_>>().join(" ")
    )))
}

async fn checkout(
    driver: &dyn AutomationDriver,
    record: &mut CaseRecord,
    shop: Shop,
) -> Result<Verdict> {
    driver.click("button:has-text(\"Place Order\")").await?;
    shop.wait(driver, "#orderModal").await?;

    for (field, value) in CUSTOMER {
        driver
            .set_value(field, value)
            .await
            .with_context(|| format!("Failed to fill {}", field))?;
    }
    shop.screenshot(driver, record, "05_checkout_form").await?;

    driver.click("button:has-text(\"Purchase\")").await?;
    Ok(Verdict::pass(format!(
        "Filled {} order fields and submitted purchase",
        CUSTOMER.len()
    )))
}

async fn verify_confirmation(
    driver: &dyn AutomationDriver,
    record: &mut CaseRecord,
    shop: Shop,
) -> Result<Verdict> {
    driver
        .wait_for(&Locator::parse(".sweet-alert"), CONFIRMATION_TIMEOUT_MS)
        .await?;
    let heading = driver.text(".sweet-alert h2").await?;
    shop.screenshot(driver, record, "06_order_confirmation").await?;
    Ok(Verdict::pass(format!("Confirmation shown: \"{}\"", heading.trim())))
}

async fn capture_order_id(
    driver: &dyn AutomationDriver,
    record: &mut CaseRecord,
    shop: Shop,
) -> Result<Verdict> {
    let confirmation = driver.text(".sweet-alert p.lead").await?;

    let Some(order_id) = extract_order_id(&confirmation) else {
        return Ok(Verdict::fail(format!(
            "No order id in confirmation: \"{}\"",
            confirmation.trim()
        )));
    };

    std::fs::write(&shop.order_id_path, &order_id).with_context(|| {
        format!("Failed to write {}", shop.order_id_path.display())
    })?;
    log::info!("Order ID {} saved to {}", order_id, shop.order_id_path.display());

    record.detail("orderId", json!(order_id));
    Ok(Verdict::pass(format!("Order ID: {}", order_id)))
}
