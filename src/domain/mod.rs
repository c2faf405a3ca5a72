pub mod follow;
pub mod job;
pub mod notification;
pub mod ports;
pub mod post;
pub mod user;
