mod delivery_policy;
mod dispatch;
mod dispatcher;
mod notification;
mod push_subscription;

pub use delivery_policy::{PolicyDecision, SkipReason};
pub use dispatch::*;
pub use dispatcher::*;
pub use notification::*;
pub use push_subscription::*;
