pub mod item;
pub mod source;
