pub mod collation;
pub mod config;
pub mod document_store;
pub mod error;
pub mod folder_index;
pub mod host;
pub mod provision;
pub mod record;
pub mod server;
pub mod storage;
pub mod timefmt;
