pub mod handle_directory;

pub use handle_directory::HandleDirectory;
