pub mod doctor;
pub mod list;

pub use doctor::{execute_doctor, execute_reset};
pub use list::execute_list;
