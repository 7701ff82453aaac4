pub mod mapper;
pub mod mapping;
pub mod rotation;

pub use mapper::{PoseMapper, PoseReport};
pub use mapping::{AnchorMapping, LimbMapping, MappingTable};
pub use rotation::ChainRotation;
