pub mod drive;

pub use drive::normalize_drive_url;
