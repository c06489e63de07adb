//! Notification envelopes and dispatching.
//!
//! - `types`: channel, priority and the immutable `NotificationEnvelope`
//! - `builder`: request validation and envelope construction
//! - `dispatcher`: routes envelopes to the queue or to channel adapters

mod builder;
mod dispatcher;
mod types;

pub(crate) use builder::required;
pub use builder::{build_envelopes, NotificationBuilder, RawNotificationRequest, ValidationError};
pub use dispatcher::{
    ChannelDeliveryFailure, DispatchError, DispatchMode, DispatchReceipt, DispatcherStats,
    DispatcherStatsSnapshot, NotificationDispatcher,
};
pub use types::{redact, ChannelType, NotificationEnvelope, Priority, QueuedNotification};
