pub mod broker;
pub mod consumer;
pub mod publisher;
