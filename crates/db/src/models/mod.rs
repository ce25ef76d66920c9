pub mod access_log;
pub mod attendance;
pub mod business;
pub mod cart;
pub mod class;
pub mod message;
pub mod order;
pub mod payment;
pub mod plan;
pub mod product;
pub mod schedule;
pub mod score;
pub mod session;
pub mod status;
pub mod subscription;
pub mod survey;
pub mod telegram;
pub mod user;
