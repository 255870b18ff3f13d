pub mod api_router;
pub mod attachments;
pub mod config;
pub mod main_module;
pub mod shared;
pub mod storage;
pub mod tickets;

#[cfg(test)]
pub mod tests;
