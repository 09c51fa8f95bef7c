//! Broadcast hub and streaming subscribers.
//!
//! The hub is an actor that exclusively owns the subscriber set. Every
//! membership change and broadcast is applied by its single event loop;
//! callers interact through a cloneable [`HubHandle`].
//!
//! Each [`Subscriber`] owns a bounded queue and a delivery loop
//! ([`Subscriber::listen`]) that writes encoded frames to its
//! [`EventSink`].

pub mod config;
pub mod error;
pub mod hub;
pub mod sink;
pub mod subscriber;
pub mod wire;

pub use config::HubConfig;
pub use error::{HubError, HubResult, SendError, SinkError};
pub use hub::{spawn_hub, HubHandle, HubTask};
pub use sink::{BoxFuture, EventSink, MockEventSink};
pub use subscriber::{ListenExit, Subscriber};
pub use wire::encode_frame;
