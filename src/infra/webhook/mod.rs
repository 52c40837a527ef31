//! Outbound webhooks.

pub mod revoke;

pub use revoke::WebhookRoleRevoker;
