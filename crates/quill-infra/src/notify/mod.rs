//! Post notifier implementations.

mod broadcast;

pub use broadcast::BroadcastNotifier;
