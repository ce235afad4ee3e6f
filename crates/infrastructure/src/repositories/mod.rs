//! SQLite implementations of the `MediaRepo`/`NZBRepo` traits defined in
//! `momenarr-core`.

pub mod media;
pub mod nzb;

pub use media::SqliteMediaRepo;
pub use nzb::SqliteNzbRepo;
