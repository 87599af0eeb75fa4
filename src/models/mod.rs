pub mod item;
pub mod user;

pub use item::*;
pub use user::*;
