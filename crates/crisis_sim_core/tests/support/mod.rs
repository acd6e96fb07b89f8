pub mod fixtures;
pub mod playback;
