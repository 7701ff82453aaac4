pub mod config;
pub mod dispatch;
pub mod pose;
pub mod protocol;
pub mod rig;
pub mod server;
pub mod skeleton;
