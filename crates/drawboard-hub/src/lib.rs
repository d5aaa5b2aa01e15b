//! The connection registry ("hub") for the shared drawboard.
//!
//! One Tokio task owns the set of live clients. Everything else talks to
//! it through a [`HubHandle`]: register a client, unregister it, or
//! broadcast a frame to all of them. Because only the actor touches the
//! set, there's no lock around it.
//!
//! # Backpressure
//!
//! Every client has a bounded outbound queue. A broadcast never waits on
//! a client: it tries to enqueue, and a client whose queue is full (or
//! whose writer is gone) is dropped from the hub on the spot.
//!
//! ```text
//! reader tasks ──broadcast──▶ Hub actor ──try_send──▶ client queues ──▶ writer tasks
//! ```

mod client;
mod config;
mod error;
mod hub;

pub use client::{Broadcast, Client};
pub use config::HubConfig;
pub use error::HubError;
pub use hub::{HubHandle, spawn_hub};
