//! 基础设施层：作业存储的 SQLite 实现

pub mod database;

pub use database::*;
