pub mod collection;
pub mod search;
pub mod session;
pub mod subject;

mod error;

pub use collection::{Category, Shelf};
pub use error::Error;
pub use session::Session;
pub use subject::Subject;
