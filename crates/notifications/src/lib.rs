//! Downloader completion-callback handling (C7, §4.7): the `NotificationHandler`
//! that processes webhook payloads, plus an opt-in helper for the
//! move-largest-file-into-`DownloadDir` file-handling variant.

pub mod handler;
pub mod largest_file;

pub use handler::{NotificationConfig, NotificationHandler};
pub use largest_file::move_largest_file;
