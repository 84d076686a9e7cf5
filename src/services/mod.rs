pub mod likes;
pub mod notifications;
