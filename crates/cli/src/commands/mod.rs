pub mod dev;
pub mod kv;
pub mod queues;
