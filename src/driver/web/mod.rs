mod driver;

pub use driver::{to_playwright_selector, BrowserConfig, BrowserDriver};
