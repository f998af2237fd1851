use std::collections::HashMap;
use std::env;
use std::fs;

use elevio_rust::elevio::packet;

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
pub struct NetworkConfigFile {
    pub relay_hosts: Vec<String>,
    pub relay_ports: Vec<u16>,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
pub struct ConfigFile {
    pub server: HashMap<String, Vec<u16>>,
    pub network: NetworkConfigFile,
    pub elevator: HashMap<String, u8>,
}

fn read_config_file() -> Result<ConfigFile, serde_json::Error> {
    let file_path = "config.json";
    let fallback_file_path = "_config.json";
    let config_contents = match fs::read_to_string(file_path) {
        Ok(content) => content,
        Err(_) => {
            println!("No configuration file provided, using default settings...");
            fs::read_to_string(fallback_file_path).unwrap()
        }
    };
    serde_json::from_str(&config_contents)
}

fn parse_env_args(defaultport: u16) -> (u8, u16) {
    let (mut num, mut serverport) = (0, defaultport);

    let args: Vec<String> = env::args().collect();
    for arg_pair in args.rchunks_exact(2) {
        match arg_pair[0].as_str() {
            "--num" => {
                num = match arg_pair[1].parse::<u8>() {
                    Ok(num) => num,
                    Err(_) => {
                        println!("num {} is not a number, skipping...", arg_pair[1]);
                        num
                    }
                };
            }
            "--serverport" => {
                serverport = match arg_pair[1].parse::<u16>() {
                    Ok(num) => num,
                    Err(_) => {
                        println!("port {} is not a number, skipping...", arg_pair[1]);
                        serverport
                    }
                };
            }
            _ => {
                println!("illegal argument {}, skipping...", arg_pair[0]);
            }
        }
    }
    (num, serverport)
}

/// One entry per car: either a local hardware server reached over TCP, or a
/// remote car reached over UDP through its relay.
#[derive(Debug, Clone)]
pub enum CarEndpoint {
    Hardware { addr: String },
    Node { addr: String },
}

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub endpoints: Vec<CarEndpoint>,
}

impl CoordinatorConfig {
    pub fn get() -> Self {
        let config_file = read_config_file().unwrap();
        check_num_floors(&config_file);

        let mut endpoints = Vec::new();
        for port in &config_file.server["ports"] {
            endpoints.push(CarEndpoint::Hardware {
                addr: format!("localhost:{}", port),
            });
        }
        let network = &config_file.network;
        for (host, port) in network.relay_hosts.iter().zip(&network.relay_ports) {
            endpoints.push(CarEndpoint::Node {
                addr: format!("{}:{}", host, port),
            });
        }

        CoordinatorConfig { endpoints }
    }
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub upstream_port: u16,
    pub server_addr: String,
}

impl RelayConfig {
    pub fn get() -> Self {
        let config_file = read_config_file().unwrap();
        check_num_floors(&config_file);
        let (num, serverport) = parse_env_args(config_file.server["ports"][0]);

        RelayConfig {
            upstream_port: config_file.network.relay_ports[num as usize],
            server_addr: format!("localhost:{}", serverport),
        }
    }
}

fn check_num_floors(config_file: &ConfigFile) {
    let num_floors = config_file.elevator["num_floors"];
    assert_eq!(
        num_floors,
        packet::NUM_FLOORS,
        "config says {} floors but this build supports {}",
        num_floors,
        packet::NUM_FLOORS
    );
}
