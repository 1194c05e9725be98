// Filesystem helpers: test discovery, sorting, snapshot-mode file updates.

pub mod file;

pub use file::FileUtils;
