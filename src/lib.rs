//! A library for controlling Cryo-con temperature controllers over their text protocol.
//!
//! This crate provides two main ways to interact with a controller:
//!
//! 1.  **High-Level Clients**: A stateful client that knows the channels and
//!     loops it manages, verifies set points by reading them back and batches
//!     reads into as few round trips as the line length allows. See
//!     [`client::CryoCon`] and its thread-safe wrapper [`safe_client::SafeClient`].
//!
//! 2.  **Low-Level Building Blocks**: Command builders, value codecs and a
//!     sans-IO [`batch::Batch`] that map directly to the controller's
//!     commands. See the [`command`], [`codec`] and [`batch`] modules.
//!
//! ## Features
//!
//! - **Protocol Implementation**: Channels, control loops and system settings of the Cryo-con command language.
//! - **Read Back Verification**: Set point, output power and range writes are checked against the controller's reply.
//! - **Failure Suppression**: After a transport failure, requests fail fast for a configurable window.
//! - **Pluggable Transports**: Blocking TCP and serial lines out of the box, `tokio` streams behind the `tokio` feature.
//! - **Strongly-Typed API**: Utilizes Rust's type system for protocol correctness (e.g., `ChannelId`, `LoopId`, `Unit`).
//!
//! ## Quick Start
//!
//! ```no_run
//! use cryocon_lib::{
//!     client::CryoCon,
//!     connection::{self, ConnectionUrl},
//!     protocol::{ChannelId, LoopId, DEFAULT_BAUD_RATE},
//! };
//! use std::time::Duration;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let url: ConnectionUrl = "tcp://192.168.1.20".parse()?;
//!     let transport = connection::open(&url, Duration::from_secs(1), DEFAULT_BAUD_RATE)?;
//!     let mut ctrl = CryoCon::new(transport);
//!
//!     println!("Channel A: {:?}", ctrl.channel(ChannelId::A)?.temperature()?);
//!     ctrl.control_loop(LoopId::try_from(1u8)?)?.set_set_point(77.0)?;
//!
//!     Ok(())
//! }
//! ```

pub mod attribute;
pub mod batch;
pub mod client;
pub mod codec;
pub mod command;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod safe_client;
pub mod transport;

#[cfg_attr(docsrs, doc(cfg(feature = "tokio")))]
#[cfg(feature = "tokio")]
pub mod tokio_transport;

#[cfg(test)]
mod mock;
