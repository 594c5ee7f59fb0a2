pub mod backup_exchange;
pub mod collections;
pub mod core;
pub mod courses;
pub mod dashboard;
pub mod forms;
pub mod students;
