//! Default values shared across the gateway

pub mod defaults {
    /// Name of the configuration file inside the config directory
    pub const CONFIG_FILE: &str = "gateway.json";

    /// HTTP request timeout
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;

    /// Interval between execution status polls against a remote server
    pub const POLL_INTERVAL_MS: u64 = 500;

    /// Time each node takes in the simulated executor
    pub const SIMULATED_STEP_MS: u64 = 150;

    /// Snapshots retained by an editor session
    pub const HISTORY_CAPACITY: usize = 100;
}
