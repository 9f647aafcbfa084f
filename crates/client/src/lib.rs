//! Worker runtime for pwacache.
//!
//! This crate provides the network fetch seam, cache strategies, window
//! clients, push notifications and the `ServiceWorker` event router used by
//! the host server.

pub mod clients;
pub mod fetch;
pub mod notification;
pub mod strategy;
pub mod worker;

#[cfg(test)]
mod testing;

pub use clients::{ClientRegistry, Clients, WindowClient};
pub use fetch::{FetchConfig, FetchRequest, Fetcher, HttpFetcher, RequestMode, Response, ResponseSource};
pub use notification::{ClickTarget, Notification, NotificationAction, PushKind};
pub use strategy::{Classifier, Revalidation, Route, StrategyRunner};
pub use worker::{
    ActivateReport, ClickOutcome, FetchOutcome, InstallReport, MessageReply, NotificationClick, ServiceWorker,
    WorkerMessage, WorkerState, WorkerStatus,
};
