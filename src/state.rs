use std::sync::Arc;

use crate::config::Config;
use crate::room::Room;

/// Shared by every connection task.
#[derive(Clone)]
pub struct ServerState {
    pub room: Room,
    pub config: Arc<Config>,
}

impl ServerState {
    pub fn new(config: Config) -> Self {
        Self {
            room: Room::new(config.server_name.as_str()),
            config: Arc::new(config),
        }
    }

    pub fn server_name(&self) -> &str {
        self.room.server_name()
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
