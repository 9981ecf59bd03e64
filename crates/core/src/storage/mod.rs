pub mod backup;
pub mod kv;
pub mod persistence;
