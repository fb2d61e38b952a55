//! Reconnecting real-time channel.
//!
//! This module contains:
//! - [`backoff`]: Exponential backoff delay computation
//! - [`state`]: The channel lifecycle state enum
//! - [`reconnecting`]: [`ReconnectingChannel`], the transport owner with
//!   automatic reconnection and JSON framing

pub mod backoff;
pub mod reconnecting;
pub mod state;

pub use reconnecting::{ReconnectingChannel, ReconnectingChannelBuilder};
pub use state::ChannelState;
