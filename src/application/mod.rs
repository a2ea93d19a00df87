pub mod flush_scheduler;
pub mod item_queue;
