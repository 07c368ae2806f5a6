pub mod clock;
pub mod config;
pub mod db;
pub mod model;
pub mod notifier;
pub mod poller;
pub mod practicum;
pub mod validate;
