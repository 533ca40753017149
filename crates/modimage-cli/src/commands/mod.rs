mod create;
mod extract;
mod info;
mod list;

pub use create::*;
pub use extract::*;
pub use info::*;
pub use list::*;
