pub mod canonical;

pub use canonical::{ConvertedDocument, Message, Thread, THREAD_STATUS_DONE};
