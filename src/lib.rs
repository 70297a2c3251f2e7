pub mod api_router;
pub mod automation;
pub mod channels;
pub mod config;
pub mod customers;
pub mod dashboard;
pub mod inventory;
pub mod jobs;
pub mod llm;
pub mod projects;
pub mod reports;
pub mod shared;
pub mod staff;
pub mod storage;
