pub mod attachment;
pub mod dispatcher;

pub use attachment::{media_type_for, Attachment, DEFAULT_SUGGESTED_EXTENSIONS};
pub use dispatcher::UploadDispatcher;
