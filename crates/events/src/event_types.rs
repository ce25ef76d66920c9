//! Event type names published on the bus.

pub const BUSINESS_CREATED: &str = "business.created";

pub const SUBSCRIPTION_CREATED: &str = "subscription.created";
pub const SUBSCRIPTION_UPDATED: &str = "subscription.updated";
pub const SUBSCRIPTION_RENEWED: &str = "subscription.renewed";
pub const SUBSCRIPTION_CANCELLED: &str = "subscription.cancelled";
pub const SUBSCRIPTION_SUSPENDED: &str = "subscription.suspended";
pub const SUBSCRIPTION_REACTIVATED: &str = "subscription.reactivated";
pub const SUBSCRIPTION_EXTENDED: &str = "subscription.extended";
pub const SUBSCRIPTION_PLAN_CHANGED: &str = "subscription.plan_changed";
pub const SUBSCRIPTION_EXPIRED: &str = "subscription.expired";
pub const SUBSCRIPTION_EXPIRING: &str = "subscription.expiring";

pub const ORDER_PLACED: &str = "order.placed";
pub const ORDER_STATUS_CHANGED: &str = "order.status_changed";

pub const PAYMENT_COMPLETED: &str = "payment.completed";
