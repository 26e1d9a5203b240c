//! Remote driver boundary for twofa.
//!
//! The session core talks to the browser through the [`Driver`] trait only.
//! This crate defines that trait together with [`WebDriverClient`], an
//! implementation speaking the W3C WebDriver HTTP protocol to an already
//! running driver executable (chromedriver, geckodriver, a Selenium grid).

pub mod driver;
pub mod error;
pub mod webdriver;

pub use driver::{Driver, Element, Launcher};
pub use error::{DriverError, Result};
pub use webdriver::{WebDriverClient, WebDriverLauncher};
