pub mod cache;
pub mod database;
pub mod server;
pub mod storage;
