//! Page acquisition: transports, retry policy, and the headless render engine.
//!
//! This crate provides:
//! - [`Transport`]: one way of turning a URL into markup
//! - [`DirectTransport`]: a single browser-like HTTP GET
//! - [`RenderTransport`] / [`RenderEngine`]: headless Chrome rendering with a lazily
//!   launched, explicitly shut down browser
//! - [`Fetcher`]: per-attempt transport selection with linear-backoff retries

mod direct;
mod guard;
mod render;
mod strategy;
mod transport;

pub use direct::DirectTransport;
pub use guard::is_private_target;
pub use render::{RenderEngine, RenderTransport};
pub use strategy::Fetcher;
pub use transport::Transport;
