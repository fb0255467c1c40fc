mod course;
mod enrollment;
mod session;
mod user;


pub use course::*;
pub use enrollment::*;
pub use session::*;
pub use user::*;

/// Generate a fresh opaque entity id.
pub fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}
