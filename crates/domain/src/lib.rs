pub mod entities;
pub mod repositories;
pub mod value_objects;
pub mod views;

pub use entities::*;
pub use repositories::*;
pub use scheduler_core::{SchedulerError, SchedulerResult};
pub use value_objects::*;
pub use views::*;
