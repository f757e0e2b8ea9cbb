pub mod db;
pub mod redis;
pub mod rabbitmq;
