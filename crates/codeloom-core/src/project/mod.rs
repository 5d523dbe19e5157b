mod file;

pub use file::{FileAction, FileOperation, Language, ProjectFile};
