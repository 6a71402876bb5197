//! Zone control: typed commands on top of the connection

pub mod volume;
pub mod zone;


pub use volume::VolumeScale;
pub use zone::ZoneController;
