mod principal;
mod stream;
mod token;
mod user;

pub use principal::*;
pub use stream::*;
pub use token::*;
pub use user::*;
