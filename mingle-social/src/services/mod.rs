pub mod follow_service;
pub mod notification_service;
pub mod post_service;
pub mod profile_service;
pub mod thread;
