mod calories;
mod favorites;
mod recipes;
mod reviews;
mod trending;
mod users;

pub use calories::*;
pub use favorites::*;
pub use recipes::*;
pub use reviews::*;
pub use trending::*;
pub use users::*;
