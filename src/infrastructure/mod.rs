pub mod stream;
pub mod webhook;
