pub mod landmark;

pub use landmark::{Landmark, LandmarkSet};
