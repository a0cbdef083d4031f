pub mod audit;
pub mod meta;
pub mod request_log;
pub mod shifts;
pub mod status_log;
pub mod users;
