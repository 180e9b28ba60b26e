//! Method names used by the client core.

// Requests.
pub const HELLO: &str = "hello";
pub const AUTHENTICATE: &str = "authenticate";
pub const SUBSCRIBE: &str = "subscribe";
pub const UNSUBSCRIBE: &str = "unsubscribe";
pub const SUBSCRIPTION_SEEK: &str = "subscriptionSeek";
pub const SUBSCRIPTION_SPEED: &str = "subscriptionSpeed";
pub const SUBSCRIPTION_CHANGE_WEIGHT: &str = "subscriptionChangeWeight";

// Asynchronous pushes.
pub const MUXPKT: &str = "muxpkt";
pub const SUBSCRIPTION_START: &str = "subscriptionStart";
pub const SUBSCRIPTION_STOP: &str = "subscriptionStop";
pub const SUBSCRIPTION_SKIP: &str = "subscriptionSkip";
pub const SUBSCRIPTION_GRACE: &str = "subscriptionGrace";
pub const QUEUE_STATUS: &str = "queueStatus";
pub const SIGNAL_STATUS: &str = "signalStatus";
pub const TIMESHIFT_STATUS: &str = "timeshiftStatus";
pub const DESCRAMBLE_INFO: &str = "descrambleInfo";
