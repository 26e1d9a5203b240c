//! twofa: two-factor session lifecycle for a remote interactive service.
//!
//! A [`Connection`] owns one driver session and walks the login flow (phone
//! number, PIN, SMS challenge) through it. Once logged in, a background task
//! keeps the server-side session from expiring, and every session-dependent
//! call goes through [`Connection::run_guarded`] so that it never overlaps
//! with the keep-alive traffic or with another caller.
//!
//! ```ignore
//! use std::sync::Arc;
//! use twofa::{ConnectionFactory, LoginOutcome, SessionConfig, WebDriverLauncher};
//!
//! let launcher = Arc::new(WebDriverLauncher::chrome("http://localhost:9515", true)?);
//! let factory = ConnectionFactory::new(launcher, SessionConfig::default());
//! let connection = factory.create().await?;
//!
//! match connection.login("+491776200214", 1488, read_sms_code).await? {
//!     LoginOutcome::Success => println!("logged in"),
//!     other => println!("login failed: {other}"),
//! }
//! factory.close().await?;
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod factory;
pub mod fake_driver;
mod keepalive;
mod login;
pub mod outcome;
pub mod phone;
pub mod poller;
pub mod state;

pub use config::{Selectors, SessionConfig, SiteUrls, Timing};
pub use connection::{Connection, ConnectionSnapshot};
pub use error::{Error, Result};
pub use factory::ConnectionFactory;
pub use outcome::LoginOutcome;
pub use phone::{Fingerprint, PhoneError, PhoneNumber};
pub use poller::Poller;
pub use state::{Phase, SessionSnapshot};
pub use twofa_runtime::{Driver, DriverError, Element, Launcher, WebDriverClient, WebDriverLauncher};
