// One module per resource; routes are wired in `server::app`
pub mod auth;
pub mod bootcamps;
pub mod courses;
pub mod reviews;
pub mod system;
pub mod users;
