use alloc::string::{String, ToString};

use mirra_api::SleepPolicy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Pause before every transmission so the peer can switch to receive
    pub send_delay_ms: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self { send_delay_ms: 500 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub transport: TransportConfig,
    /// Seconds a node wakes ahead of its comm slot
    pub wake_before_comm_period: u32,
    pub default_sample_interval: u32,
    pub default_sample_rounding: u32,
    pub default_sample_offset: u32,
    pub discovery_timeout_ms: u32,
    /// Seconds an unregistered node sleeps between discovery windows
    pub discovery_retry_interval: u32,
    pub time_config_timeout_ms: u32,
    pub time_config_attempts: u8,
    pub sensor_data_timeout_ms: u32,
    pub sensor_data_attempts: u8,
    pub max_data_file_size: usize,
    pub data_path: String,
    pub data_temp_path: String,
    pub sleep: SleepPolicy,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            wake_before_comm_period: 3,
            default_sample_interval: 3600,
            default_sample_rounding: 3600,
            default_sample_offset: 0,
            discovery_timeout_ms: 300_000,
            discovery_retry_interval: 600,
            time_config_timeout_ms: 6000,
            time_config_attempts: 1,
            sensor_data_timeout_ms: 6000,
            sensor_data_attempts: 1,
            max_data_file_size: 32 * 1024,
            data_path: "/data.dat".to_string(),
            data_temp_path: "/data_temp.dat".to_string(),
            sleep: SleepPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub transport: TransportConfig,
    /// Seconds the gateway wakes ahead of the first comm slot
    pub wake_before_comm_period: u32,
    /// Seconds of listening added before each node's slot and between slots
    pub comm_period_padding: u32,
    pub comm_interval: u32,
    /// Comm periods between two upload periods
    pub upload_every: u32,
    pub sample_interval: u32,
    pub sample_rounding: u32,
    pub sample_offset: u32,
    pub discovery_timeout_ms: u32,
    /// Seconds between periodic discovery rounds
    pub discovery_interval: u32,
    pub time_config_timeout_ms: u32,
    pub time_config_attempts: u8,
    pub sensor_data_timeout_ms: u32,
    pub sensor_data_attempts: u8,
    pub max_data_file_size: usize,
    pub topic_prefix: String,
    pub uplink_attempts: u32,
    pub max_upload_errors: u32,
    pub nodes_path: String,
    pub data_path: String,
    pub data_temp_path: String,
    pub sleep: SleepPolicy,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            wake_before_comm_period: 10,
            comm_period_padding: 5,
            comm_interval: 86_400,
            upload_every: 3,
            sample_interval: 10_800,
            sample_rounding: 3600,
            sample_offset: 0,
            discovery_timeout_ms: 5000,
            discovery_interval: 86_400,
            time_config_timeout_ms: 3000,
            time_config_attempts: 3,
            sensor_data_timeout_ms: 6000,
            sensor_data_attempts: 2,
            max_data_file_size: 1024 * 1024,
            topic_prefix: "fornalab".to_string(),
            uplink_attempts: 3,
            max_upload_errors: 5,
            nodes_path: "/nodes.dat".to_string(),
            data_path: "/data.dat".to_string(),
            data_temp_path: "/data_temp.dat".to_string(),
            sleep: SleepPolicy {
                max_sleep: 86_400,
                timer_threshold: 10,
            },
        }
    }
}
