pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod ledger;
pub mod notifier;
pub mod rpc;
pub mod rules;
pub mod snapshot;
pub mod utils;
pub mod watcher;
