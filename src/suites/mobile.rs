//! WebdriverIO native demo app flows driven through Appium

use anyhow::Result;
use serde_json::{json, Value};
use std::time::Duration;

use crate::driver::appium::AppiumDriver;
use crate::driver::traits::{AutomationDriver, Session};
use crate::runner::{CaseRecord, ScreenshotSink, SuiteRunner, TestCase, Verdict};
use crate::utils::config::AppiumConfig;

pub const SUITE: &str = "mobile";

pub type MobileCase = TestCase<dyn AutomationDriver>;

const LOGIN_EMAIL: &str = "test@webdriver.io";
const LOGIN_PASSWORD: &str = "Test123!";
const SUCCESS_MESSAGE: &str = "//android.widget.TextView[contains(@text, \"Success\")]";
const ERROR_MESSAGE: &str =
    "//android.widget.TextView[contains(@text, \"Invalid\") or contains(@text, \"Error\")]";

const FORM_TEXT: &str = "Automation Testing with WebdriverIO";
const DROPDOWN_CHOICE: &str = "This app is awesome";
const DROPDOWN_OPTION: &str = "//android.widget.CheckedTextView[@text=\"This app is awesome\"]";
const DROPDOWN_VALUE: &str = "//android.widget.EditText[@text=\"This app is awesome\"]";

const CARD_CONTENT: &str =
    "//android.widget.TextView[contains(@text, \"Card\") or contains(@text, \"Swipe\")]";

/// Open the Appium session, let the app settle and capture the launch screen
pub async fn connect(
    config: &AppiumConfig,
    screenshots: &ScreenshotSink,
) -> Result<Box<dyn AutomationDriver>> {
    log::info!("Connecting to Appium server at {}", config.server_url);
    let driver = AppiumDriver::connect(
        &config.server_url,
        &config.capabilities,
        Duration::from_secs(config.command_timeout_secs),
    )
    .await?;

    tokio::time::sleep(Duration::from_millis(config.settle_ms)).await;

    if let Err(e) = screenshots.capture(&driver, "setup", "app_launched").await {
        if let Err(close_err) = driver.close().await {
            log::warn!("failed to close Appium session: {:#}", close_err);
        }
        return Err(e);
    }

    Ok(Box::new(driver))
}

/// Shared per-run state handed to every flow
#[derive(Clone)]
pub struct Flow {
    shots: ScreenshotSink,
    /// Wait for animations between steps
    pace: bool,
}

impl Flow {
    pub fn new(shots: ScreenshotSink) -> Self {
        Self { shots, pace: true }
    }

    /// Skip inter-step waits (stub drivers have nothing to animate)
    pub fn without_pauses(mut self) -> Self {
        self.pace = false;
        self
    }

    async fn pause(&self, ms: u64) {
        if self.pace {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }
}

/// Login, Forms and Swipe flows, each capturing an ERROR screenshot on failure
pub fn runner(flow: Flow) -> SuiteRunner<dyn AutomationDriver> {
    let login = flow.clone();
    let forms = flow.clone();
    let swipe = flow.clone();
    let on_error = flow.shots.clone();

    SuiteRunner::new(SUITE)
        .case(MobileCase::new(
            "Login Flow",
            "Login succeeds with a success message, or the error message is captured",
            move |driver, record| Box::pin(login_flow(driver, record, login.clone())),
        ))
        .case(MobileCase::new(
            "Forms Test",
            "Text input is echoed, switch toggles and dropdown value is selected",
            move |driver, record| Box::pin(forms_flow(driver, record, forms.clone())),
        ))
        .case(MobileCase::new(
            "Swipe Test",
            "Swipe gestures execute on the card carousel",
            move |driver, record| Box::pin(swipe_flow(driver, record, swipe.clone())),
        ))
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

/// Step log and screenshots of one flow
struct Steps<'a> {
    record: &'a mut CaseRecord,
    shots: ScreenshotSink,
    test: &'static str,
}

impl<'a> Steps<'a> {
    fn new(record: &'a mut CaseRecord, flow: &Flow, test: &'static str) -> Self {
        Self {
            record,
            shots: flow.shots.clone(),
            test,
        }
    }

    async fn screenshot(&mut self, driver: &dyn AutomationDriver, step: &str) -> Result<()> {
        let path = self.shots.capture(driver, self.test, step).await?;
        self.record.log(format!("📸 Screenshot: {}", path));
        self.record.attach(path);
        Ok(())
    }

    fn push(&mut self, step: Value) {
        if let (Some(name), Some(status)) = (step["step"].as_str(), step["status"].as_str()) {
            self.record.log(format!("{} [{}]", name, status));
        }
        self.record.push_detail("steps", step);
    }
}

/// Text of the element if it is on screen
async fn displayed_text(driver: &dyn AutomationDriver, locator: &str) -> Result<Option<String>> {
    if driver.is_displayed(locator).await? {
        Ok(Some(driver.text(locator).await?))
    } else {
        Ok(None)
    }
}

fn on_off(checked: &str) -> &'static str {
    if checked == "true" {
        "ON"
    } else {
        "OFF"
    }
}

async fn login_flow(
    driver: &dyn AutomationDriver,
    record: &mut CaseRecord,
    flow: Flow,
) -> Result<Verdict> {
    let mut steps = Steps::new(record, &flow, "login");

    driver.click("~Login").await?;
    flow.pause(1000).await;
    steps.screenshot(driver, "01_navigate_to_login").await?;
    steps.push(json!({
        "step": "Navigate to Login",
        "status": "PASS",
        "locator": "~Login",
        "strategy": "Accessibility ID",
    }));

    driver.set_value("~input-email", LOGIN_EMAIL).await?;
    driver.set_value("~input-password", LOGIN_PASSWORD).await?;
    flow.pause(500).await;
    steps.screenshot(driver, "02_credentials_entered").await?;
    steps.push(json!({
        "step": "Enter Credentials",
        "status": "PASS",
        "locator": "~input-email, ~input-password",
        "strategy": "Accessibility ID",
    }));

    driver.click("~button-LOGIN").await?;
    flow.pause(3000).await;
    steps.screenshot(driver, "03_after_login").await?;

    let verdict = if let Some(message) = displayed_text(driver, SUCCESS_MESSAGE).await? {
        steps.push(json!({
            "step": "Verify Success",
            "status": "PASS",
            "locator": SUCCESS_MESSAGE,
            "strategy": "XPath (partial text)",
            "result": message,
        }));
        Verdict::pass(format!("Success: {}", message))
    } else if let Some(message) = displayed_text(driver, ERROR_MESSAGE).await? {
        // A rejected login still counts once the message is captured
        steps.push(json!({
            "step": "Capture Error",
            "status": "PASS",
            "locator": ERROR_MESSAGE,
            "strategy": "XPath (partial text)",
            "result": message,
        }));
        Verdict::pass(format!("Error captured: {}", message))
    } else {
        steps.push(json!({
            "step": "Verify Result",
            "status": "FAIL",
            "error": "No message displayed",
        }));
        Verdict::fail("No success or error message found")
    };

    driver.back().await?;
    steps.screenshot(driver, "04_back_to_home").await?;

    Ok(verdict)
}

async fn forms_flow(
    driver: &dyn AutomationDriver,
    record: &mut CaseRecord,
    flow: Flow,
) -> Result<Verdict> {
    let mut steps = Steps::new(record, &flow, "forms");

    driver.click("~Forms").await?;
    flow.pause(1000).await;
    steps.screenshot(driver, "01_navigate_to_forms").await?;
    steps.push(json!({
        "step": "Navigate to Forms",
        "status": "PASS",
        "locator": "~Forms",
        "strategy": "Accessibility ID",
    }));

    driver.click("~text-input").await?;
    driver.set_value("~text-input", FORM_TEXT).await?;
    let echoed = driver.text("~input-text-result").await?;
    flow.pause(500).await;
    steps.screenshot(driver, "02_text_input").await?;
    steps.push(json!({
        "step": "Fill Text Input",
        "status": "PASS",
        "locator": "~text-input, ~input-text-result",
        "strategy": "Accessibility ID",
        "input": FORM_TEXT,
        "output": echoed,
    }));

    let initial = driver.attribute("~switch", "checked").await?;
    driver.click("~switch").await?;
    flow.pause(500).await;
    let toggled = driver.attribute("~switch", "checked").await?;
    let switch_text = driver.text("~switch-text").await?;
    steps.screenshot(driver, "03_switch_toggled").await?;
    steps.push(json!({
        "step": "Toggle Switch",
        "status": "PASS",
        "locator": "~switch, ~switch-text",
        "strategy": "Accessibility ID",
        "initialState": on_off(&initial),
        "newState": on_off(&toggled),
        "displayText": switch_text,
    }));

    driver.click("~Dropdown").await?;
    flow.pause(1000).await;
    driver.click(DROPDOWN_OPTION).await?;
    flow.pause(500).await;
    let selected = driver.text(DROPDOWN_VALUE).await?;
    steps.screenshot(driver, "04_dropdown_selected").await?;
    steps.push(json!({
        "step": "Select Dropdown",
        "status": "PASS",
        "locator": format!("~Dropdown, {}", DROPDOWN_OPTION),
        "strategy": "Accessibility ID + XPath",
        "selected": selected,
    }));

    let text_ok = echoed == FORM_TEXT;
    let switch_ok = toggled == "true" || toggled == "false";
    let dropdown_ok = selected == DROPDOWN_CHOICE;
    steps.record.detail(
        "verification",
        json!({ "text": text_ok, "switch": switch_ok, "dropdown": dropdown_ok }),
    );
    steps.screenshot(driver, "05_final_verification").await?;

    let actual = format!(
        "Text: \"{}\", switch: {} -> {}, dropdown: \"{}\"",
        echoed,
        on_off(&initial),
        on_off(&toggled),
        selected
    );
    Ok(Verdict::check(text_ok && dropdown_ok, actual))
}

async fn swipe_flow(
    driver: &dyn AutomationDriver,
    record: &mut CaseRecord,
    flow: Flow,
) -> Result<Verdict> {
    let mut steps = Steps::new(record, &flow, "swipe");

    driver.click("~Swipe").await?;
    flow.pause(2000).await;
    steps.screenshot(driver, "01_navigate_to_swipe").await?;
    steps.push(json!({
        "step": "Navigate to Swipe",
        "status": "PASS",
        "locator": "~Swipe",
        "strategy": "Accessibility ID",
    }));

    let (width, height) = driver.window_size().await?;
    let start_x = (width as f64 * 0.8) as i32;
    let end_x = (width as f64 * 0.2) as i32;
    let center_y = (height as f64 * 0.5) as i32;
    log::debug!(
        "screen {}x{}, swipe ({},{}) <-> ({},{})",
        width,
        height,
        start_x,
        center_y,
        end_x,
        center_y
    );

    let gestures = [
        ("left", (start_x, end_x), "02_after_swipe_left"),
        ("left", (start_x, end_x), "03_after_swipe_2"),
        ("right", (end_x, start_x), "04_after_swipe_right"),
    ];
    for (_, (from_x, to_x), shot) in gestures {
        driver
            .swipe((from_x, center_y), (to_x, center_y), 500)
            .await?;
        flow.pause(1000).await;
        steps.screenshot(driver, shot).await?;
    }
    steps.push(json!({
        "step": "Swipe Gestures",
        "status": "PASS",
        "gestures": gestures.iter().map(|(dir, _, _)| *dir).collect::<Vec<_>>(),
        "coordinates": { "startX": start_x, "endX": end_x, "centerY": center_y },
    }));

    // The card check is informational; the gestures themselves decide the case
    let actual = match displayed_text(driver, CARD_CONTENT).await {
        Ok(Some(card)) => format!("Swipe gestures work correctly, found \"{}\"", card),
        Ok(None) => "Swipe gestures completed".to_string(),
        Err(e) => {
            log::debug!("card lookup failed: {:#}", e);
            "Swipe gestures completed".to_string()
        }
    };

    steps.screenshot(driver, "05_final_state").await?;
    Ok(Verdict::pass(actual))
}
