//! Interactive test client for the puppet server.
//!
//! Sends one command per connection, prints the raw JSON reply.

use std::io::{self, Write};

use anyhow::Result;
use serde_json::{json, Value};
use tokio::net::TcpStream;

use ayatori::config::Config;
use ayatori::pose::Landmark;
use ayatori::protocol;

const CONFIG_PATH: &str = "config.toml";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = Config::load_or_default(CONFIG_PATH);
    let addr = config.server.listen_addr.clone();
    let max_frame = config.server.max_frame_len;

    println!("=== Ayatori Puppet Client ===");
    println!("Server: {addr}");
    println!();
    println!("Commands:");
    println!("  s                  - get skeleton structure");
    println!("  b name x y rot     - control a bone (normalized inputs)");
    println!("  a name             - set animation");
    println!("  k name             - set skin");
    println!("  p                  - send a sample standing pose");
    println!("  q                  - quit");
    println!();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let parts: Vec<&str> = input.trim().split_whitespace().collect();

        if parts.is_empty() {
            continue;
        }

        let command = match parts[0] {
            "s" => json!({"CommandType": "get_structure"}),
            "b" if parts.len() == 5 => {
                let x: f32 = parts[2].parse()?;
                let y: f32 = parts[3].parse()?;
                let rotation: f32 = parts[4].parse()?;
                json!({
                    "CommandType": "control_bone",
                    "BoneName": parts[1],
                    "X": x,
                    "Y": y,
                    "Rotation": rotation
                })
            }
            "a" if parts.len() == 2 => {
                json!({"CommandType": "set_animation", "AnimationName": parts[1]})
            }
            "k" if parts.len() == 2 => {
                json!({"CommandType": "set_skin", "SkinName": parts[1]})
            }
            "p" => json!({
                "CommandType": "update_pose_from_mediapipe",
                "MediaPipeLandmarks": standing_pose()
            }),
            "q" => {
                println!("Bye");
                break;
            }
            other => {
                println!("Unknown command: {other}");
                continue;
            }
        };

        match send_command(&addr, max_frame, &command).await {
            Ok(reply) => println!("{}", serde_json::to_string_pretty(&reply)?),
            Err(e) => eprintln!("Request failed: {e:#}"),
        }
    }

    Ok(())
}

/// One connection per request, as the protocol requires.
async fn send_command(addr: &str, max_frame: usize, command: &Value) -> Result<Value> {
    let socket = TcpStream::connect(addr).await?;
    let mut stream = protocol::message_stream(socket, max_frame);
    protocol::send_message(&mut stream, command).await?;
    protocol::recv_message(&mut stream).await
}

/// A neutral standing pose covering the full landmark vocabulary.
fn standing_pose() -> Value {
    let coords: [(Landmark, [f32; 2]); Landmark::COUNT] = [
        (Landmark::Nose, [0.50, 0.92]),
        (Landmark::ChestMid, [0.50, 0.65]),
        (Landmark::LeftShoulder, [0.58, 0.75]),
        (Landmark::LeftElbow, [0.62, 0.58]),
        (Landmark::LeftWrist, [0.64, 0.42]),
        (Landmark::RightShoulder, [0.42, 0.75]),
        (Landmark::RightElbow, [0.38, 0.58]),
        (Landmark::RightWrist, [0.36, 0.42]),
        (Landmark::LeftHip, [0.55, 0.48]),
        (Landmark::LeftKnee, [0.56, 0.27]),
        (Landmark::LeftAnkle, [0.56, 0.06]),
        (Landmark::RightHip, [0.45, 0.48]),
        (Landmark::RightKnee, [0.44, 0.27]),
        (Landmark::RightAnkle, [0.44, 0.06]),
    ];
    let mut map = serde_json::Map::new();
    for (landmark, [x, y]) in coords {
        map.insert(landmark.as_str().to_string(), json!([x, y]));
    }
    Value::Object(map)
}
