pub mod leave_request;
pub mod role;
pub mod shift;
pub mod status_entry;
pub mod user;
