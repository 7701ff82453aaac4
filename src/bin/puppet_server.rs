//! Puppet server: loads config, builds the bone graph, then serves the
//! control channel one request per connection.

use anyhow::{Context, Result};

use ayatori::config::Config;
use ayatori::dispatch::Dispatcher;
use ayatori::rig::{MappingTable, PoseMapper};
use ayatori::server::ControlServer;
use ayatori::skeleton::{BoneGraph, SkeletonDefinition};

const CONFIG_PATH: &str = "config.toml";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = Config::load_or_default(CONFIG_PATH);

    println!("=== Ayatori Puppet Server ({}) ===", env!("GIT_VERSION"));

    let skeleton = match &config.rig.skeleton_path {
        Some(path) => {
            println!("Skeleton: {path}");
            let def = SkeletonDefinition::load(path)?;
            BoneGraph::from_definition(&def)?
        }
        None => {
            println!("Skeleton: built-in figure");
            BoneGraph::standard_figure()?
        }
    };

    let table = match &config.rig.mapping_path {
        Some(path) => {
            println!("Mapping: {path}");
            MappingTable::load(path)?
        }
        None => MappingTable::standard(),
    };
    table
        .validate(&skeleton)
        .context("Mapping table does not match the skeleton")?;

    let dispatcher = Dispatcher::new(PoseMapper::new(table));
    let mut server = ControlServer::new(skeleton, dispatcher, config.server.clone());
    server.run().await
}
