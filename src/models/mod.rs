pub mod announcement;
pub mod role;
pub mod session;
