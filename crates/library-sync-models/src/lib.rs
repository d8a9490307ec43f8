pub mod library_item;
pub mod library_key;
pub mod media;
pub mod row;
pub mod search_result;
pub mod status;

pub use library_item::{ItemUpdate, LibraryItem};
pub use library_key::{derive_id, LibraryKey, ParseKeyError};
pub use media::MediaType;
pub use row::{LibraryRow, RowPatch};
pub use search_result::SearchResult;
pub use status::{ParseStatusError, WatchStatus};
