//! Wire types for the W3C WebDriver protocol.
//!
//! This crate contains the serde-serializable types exchanged with a remote
//! WebDriver endpoint over HTTP. These types represent the "protocol layer":
//! the shapes of data as they appear on the wire.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: No behavior beyond serialization/deserialization
//! * 1:1 with protocol: Match the W3C WebDriver command and response bodies
//! * Stable: Changes only when the wire protocol changes
//!
//! The driver client in `twofa-runtime` is built on top of these types.

pub mod capabilities;
pub mod element;
pub mod envelope;

pub use capabilities::*;
pub use element::*;
pub use envelope::*;
