pub mod appium;
pub mod http;
pub mod traits;
pub mod web;

pub use appium::AppiumDriver;
pub use http::{HttpClient, HttpError, HttpResponse, HttpTransport, Method};
pub use traits::{AutomationDriver, ElementAction, ElementHandle, Locator, Session};
pub use web::{BrowserConfig, BrowserDriver};
