mod author;
mod metadata;

pub use author::{Author, Role};
pub use metadata::{ComicMetadata, YEAR_MAX, YEAR_MIN};
