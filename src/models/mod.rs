pub mod post;
pub mod session;
pub mod user;

pub use post::{AuthorSummary, Post, PostResponse};
pub use session::{Session, TokenData};
pub use user::{RegisteredUser, User, UserSummary};
