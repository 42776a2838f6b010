pub mod file;
pub mod transcode;

pub use file::AudioFile;
pub use transcode::transcode_to_opus;
