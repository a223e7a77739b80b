use super::{BusError, BusOptions, MessageBus};
use rumqttc::{Client, ConnectReturnCode, Connection, ConnectionError, Event, MqttOptions, Packet, QoS};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const REQUEST_QUEUE_CAPACITY: usize = 10;

/// MQTT publisher with QoS 0 (at most once) delivery.
///
/// Dropping the bus disconnects and lets the connection thread exit.
pub struct MqttBus {
    client: Option<Client>,
    stop: Arc<AtomicBool>,
    driver: Option<JoinHandle<()>>,
}

impl MqttBus {
    pub fn new() -> Self {
        Self {
            client: None,
            stop: Arc::new(AtomicBool::new(false)),
            driver: None,
        }
    }
}

impl Default for MqttBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MqttBus {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(client) = self.client.take() {
            // Wakes the connection thread; harmless if the link is already down
            let _ = client.try_disconnect();
        }
    }
}

impl MessageBus for MqttBus {
    fn connect(&mut self, options: &BusOptions) -> Result<(), BusError> {
        let mut mqtt_options = MqttOptions::new(&options.client_id, &options.host, options.port);
        mqtt_options.set_keep_alive(options.keep_alive);
        mqtt_options.set_clean_session(options.clean_session);

        let (client, mut connection) = Client::new(mqtt_options, REQUEST_QUEUE_CAPACITY);

        wait_for_connack(&mut connection, options.connect_timeout)?;

        tracing::info!(
            broker = %options.endpoint(),
            client_id = %options.client_id,
            "MQTT connected to broker"
        );

        let stop = Arc::clone(&self.stop);
        let driver = std::thread::Builder::new()
            .name("mqtt-connection".into())
            .spawn(move || drive_connection(connection, &stop))
            .map_err(|e| BusError::Connection(e.to_string()))?;

        self.client = Some(client);
        self.driver = Some(driver);
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: Vec<u8>) {
        let Some(client) = self.client.as_ref() else {
            tracing::warn!(topic, "Publish before connect, event dropped");
            return;
        };

        if let Err(e) = client.try_publish(topic, QoS::AtMostOnce, false, payload) {
            tracing::warn!(error = %e, topic, "MQTT publish failed, event dropped");
        }
    }
}

fn wait_for_connack(connection: &mut Connection, timeout: Duration) -> Result<(), BusError> {
    let deadline = Instant::now() + timeout;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(BusError::Timeout(timeout));
        }

        match connection.recv_timeout(remaining) {
            Ok(Ok(Event::Incoming(Packet::ConnAck(ack)))) => {
                return match ack.code {
                    ConnectReturnCode::Success => Ok(()),
                    code => Err(BusError::Refused(format!("{:?}", code))),
                };
            }
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(BusError::Connection(e.to_string())),
            Err(_) => return Err(BusError::Timeout(timeout)),
        }
    }
}

/// Keeps the event loop turning so queued publishes go out, reconnecting
/// with backoff on transport errors.
///
/// Returns once `stop` is raised or the client side of the request channel
/// is gone.
fn drive_connection(mut connection: Connection, stop: &AtomicBool) {
    let mut reconnect_attempts = 0u32;

    for notification in connection.iter() {
        if stop.load(Ordering::Relaxed) {
            break;
        }

        match notification {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                if reconnect_attempts > 0 {
                    tracing::info!("MQTT reconnected to broker");
                }
                reconnect_attempts = 0;
            }
            Ok(Event::Incoming(Packet::PingResp)) => {
                tracing::trace!("MQTT ping response received");
            }
            Ok(_) => {}
            Err(ConnectionError::RequestsDone) => break,
            Err(e) => {
                reconnect_attempts = reconnect_attempts.saturating_add(1);
                let backoff = calculate_backoff(reconnect_attempts);
                tracing::warn!(
                    error = %e,
                    attempt = reconnect_attempts,
                    backoff_ms = backoff.as_millis(),
                    "MQTT connection lost, reconnecting"
                );
                std::thread::sleep(backoff);
            }
        }
    }

    tracing::debug!("MQTT connection thread stopped");
}

/// Exponential backoff with jitter, capped at 30 seconds
fn calculate_backoff(attempt: u32) -> Duration {
    const BASE_MS: u64 = 100;
    const MAX_MS: u64 = 30_000;

    let exp_backoff = BASE_MS.saturating_mul(2u64.saturating_pow(attempt.min(10)));
    let capped = exp_backoff.min(MAX_MS);

    let jitter = (capped / 10).max(1);
    let jittered = capped.saturating_add(fastrand::u64(0..jitter));

    Duration::from_millis(jittered)
}
