pub mod auth;
pub mod build_info;
pub mod storage;
