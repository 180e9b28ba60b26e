//! Subscription state for one live-stream session.

/// Priority weight sent with subscribe requests. The server uses it to
/// arbitrate tuner access between competing subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum SubscriptionWeight {
    /// Let the server's configured default apply.
    ServerConfig = 0,
    /// Background post-tuning prefetch.
    Posttuning = 40,
    /// Background pre-tuning prefetch.
    Pretuning = 50,
    /// A stream the user is actually watching.
    Normal = 150,
}

impl Default for SubscriptionWeight {
    fn default() -> Self {
        SubscriptionWeight::Normal
    }
}

/// One live-stream session.
///
/// `id` is assigned by the server and only valid once `active` is set by
/// the `subscriptionStart` push.
#[derive(Debug, Clone, Default)]
pub struct Subscription {
    pub id: u32,
    pub channel_id: u32,
    pub weight: SubscriptionWeight,
    pub active: bool,
    /// Grace period announced via `subscriptionGrace`, in seconds.
    pub grace_timeout: u32,
}
