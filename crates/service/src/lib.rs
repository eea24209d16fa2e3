//! Background service: storage coordination, summarization gateway,
//! and the page-facing request channel.

pub mod coordinator;
pub mod gateway;
pub mod rpc;
pub mod service;
pub mod sweeper;

pub use coordinator::Coordinator;
pub use gateway::SummaryGateway;
pub use rpc::{Notification, Request, Response, ServiceHandle};
pub use service::{spawn, spawn_with_backend};
