pub mod attributes;
pub mod key;
pub mod message;
pub mod signature;
