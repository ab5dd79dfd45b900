#![forbid(unsafe_code)]

pub mod calendar;
pub mod demo;
pub mod model;
pub mod store;
pub mod view;

pub use model::{PRIORITY_OPTIONS, Priority, Task, TaskDraft, TaskId};
pub use store::TaskStore;
