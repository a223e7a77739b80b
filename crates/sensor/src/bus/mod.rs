use std::time::Duration;
use thiserror::Error;

pub mod mqtt;

pub use mqtt::MqttBus;

#[derive(Debug, Clone)]
pub struct BusOptions {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub keep_alive: Duration,
    pub clean_session: bool,
    pub connect_timeout: Duration,
}

impl BusOptions {
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Error, Debug)]
pub enum BusError {
    #[error("No CONNACK within {0:?}")]
    Timeout(Duration),

    #[error("Connection refused by broker: {0}")]
    Refused(String),

    #[error("Connection error: {0}")]
    Connection(String),
}

/// One-way event sink.
pub trait MessageBus {
    /// Connect once; any failure is final.
    fn connect(&mut self, options: &BusOptions) -> Result<(), BusError>;

    /// Hand `payload` to the bus without waiting for delivery. Failures are
    /// logged and dropped.
    fn publish(&mut self, topic: &str, payload: Vec<u8>);
}
