pub mod admin_relay;
pub mod conversation;
