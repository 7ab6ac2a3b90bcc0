//! 调度器启动时的状态恢复
//!
//! 从存储加载作业，校正崩溃前残留的任务状态，并将作业分入待调度、
//! 运行中和已结束三个队列后交给调度器。

pub mod recovered_state;
pub mod recovery_service;
pub mod task_reconciler;
pub mod topological_sorter;

pub use recovered_state::*;
pub use recovery_service::*;
pub use task_reconciler::*;
pub use topological_sorter::*;
