// Copyright 2026 SheetFS Contributors.
//
// This SheetFS Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SheetFS Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SheetFS Software.

//! CLI configuration for the `sheetfs-master` and `sheetfs-datanode`
//! binaries, plus the shared timing defaults every role falls back to.

use crate::constants::{
    DEFAULT_CHECKPOINT_INTERVAL, DEFAULT_ELECTION_TIMEOUT, DEFAULT_MAX_RETRY,
    DEFAULT_RECYCLE_RETENTION,
};
use std::path::PathBuf;
use std::time::Duration;
use structopt::StructOpt;

/// Command-line configuration for a master process (primary or secondary;
/// role is decided at runtime by the election, not by a flag).
#[derive(Debug, StructOpt)]
#[structopt(name = "sheetfs-master")]
pub struct MasterConfig {
    /// Port this process listens on for client and peer RPCs.
    #[structopt(short = "p", long, default_value = "7000")]
    pub port: u16,

    /// Address advertised to clients once this process becomes primary.
    #[structopt(short = "a", long)]
    pub advertise_addr: String,

    /// Coordination-service connection string (e.g. a comma-separated list
    /// of ZooKeeper-family server addresses).
    #[structopt(short = "s", long = "server-list")]
    pub coordination_servers: String,

    /// Coordination-service session timeout.
    #[structopt(long, default_value = "1", parse(from_str = parse_secs))]
    pub election_timeout: Duration,

    /// Journal-backend connection string (e.g. a Kafka-family bootstrap
    /// server list).
    #[structopt(short = "j", long = "journal-servers")]
    pub journal_servers: String,

    /// Directory the persistent per-sheet/per-chunk index is stored under.
    #[structopt(long, parse(from_os_str), default_value = "./master-data")]
    pub data_dir: PathBuf,

    /// Interval between checkpoints.
    #[structopt(long, default_value = "60", parse(from_str = parse_secs))]
    pub checkpoint_interval: Duration,

    /// Retention period for a recycled sheet before the GC monitor
    /// permanently deletes it.
    #[structopt(long, default_value = "86400", parse(from_str = parse_secs))]
    pub recycle_retention: Duration,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            port: 7000,
            advertise_addr: "127.0.0.1:7000".to_string(),
            coordination_servers: String::new(),
            election_timeout: DEFAULT_ELECTION_TIMEOUT,
            journal_servers: String::new(),
            data_dir: PathBuf::from("./master-data"),
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            recycle_retention: DEFAULT_RECYCLE_RETENTION,
        }
    }
}

/// Command-line configuration for a data-node process.
#[derive(Debug, StructOpt)]
#[structopt(name = "sheetfs-datanode")]
pub struct DataNodeConfig {
    /// Port this process listens on for client and peer RPCs.
    #[structopt(short = "p", long, default_value = "8000")]
    pub port: u16,

    /// Address advertised to clients once this process becomes primary.
    #[structopt(short = "a", long)]
    pub advertise_addr: String,

    /// This node's identifier within its group (used for disambiguating log
    /// lines and election proposals).
    #[structopt(short = "i", long = "node-id")]
    pub node_id: String,

    /// Name of the data-node group this process belongs to.
    #[structopt(short = "g", long = "group-name")]
    pub group_name: String,

    /// Coordination-service connection string.
    #[structopt(short = "s", long = "server-list")]
    pub coordination_servers: String,

    /// Journal-backend connection string.
    #[structopt(short = "j", long = "journal-servers")]
    pub journal_servers: String,

    /// Directory chunk files are stored under.
    #[structopt(long, parse(from_os_str), default_value = "./datanode-data")]
    pub data_dir: PathBuf,
}

/// Shared client-side retry/backoff configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Coordination-service connection string used to resolve the master
    /// and data-node group primaries.
    pub coordination_servers: String,
    /// Maximum number of primary re-resolutions attempted per call.
    pub max_retry: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            coordination_servers: String::new(),
            max_retry: DEFAULT_MAX_RETRY,
        }
    }
}

fn parse_secs(s: &str) -> Duration {
    Duration::from_secs(s.parse().unwrap_or(0))
}
