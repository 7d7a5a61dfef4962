pub mod crypto;
pub mod storage;
pub mod unlock;
