use crate::config::MqttConfig;
use crate::error::SourceError;
use crate::landmarks::TimestampedFrame;
use log::*;
use rumqtt::{MqttClient, MqttOptions, Notification, QoS, ReconnectOptions};
use std::collections::VecDeque;
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

/// Producer of landmark frames, usually backed by an external pose estimator.
pub trait LandmarkSource {
    /// Newest frame since the last call. Must not block.
    fn poll(&mut self) -> Option<TimestampedFrame>;

    /// Stop producing frames and release the capture side.
    fn stop(&mut self) {}
}

impl<S: LandmarkSource + ?Sized> LandmarkSource for Box<S> {
    fn poll(&mut self) -> Option<TimestampedFrame> {
        (**self).poll()
    }

    fn stop(&mut self) {
        (**self).stop()
    }
}

const NOTIFICATION_POLL: Duration = Duration::from_millis(100);

type LatestFrame = Arc<Mutex<Option<TimestampedFrame>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Subscribes to estimator detections published over MQTT.
///
/// Messages are decoded on a background thread. Only the newest frame is kept,
/// so a slow render loop drops frames instead of queueing them.
pub struct MqttLandmarkSource {
    latest: LatestFrame,
    running: Arc<AtomicBool>,
    /// Dropping the client closes the connection.
    client: Option<MqttClient>,
    join_handle: Option<JoinHandle<()>>,
}

impl MqttLandmarkSource {
    pub fn connect(config: &MqttConfig) -> Result<Self, SourceError> {
        let mqtt_options = MqttOptions::new(config.client_id.as_str(), config.host.as_str(), config.port)
            .set_reconnect_opts(ReconnectOptions::AfterFirstSuccess(config.reconnect_secs));
        let (mut client, notifications) = MqttClient::start(mqtt_options)
            .map_err(|error| SourceError::Connect(format!("{:?}", error)))?;
        info!("Connected to MQTT at {}:{}", config.host, config.port);

        client
            .subscribe(config.topic.as_str(), QoS::AtMostOnce)
            .map_err(|error| SourceError::Subscribe {
                topic: config.topic.clone(),
                reason: format!("{:?}", error),
            })?;
        trace!("Subscribing to {}", config.topic);

        let latest: LatestFrame = Arc::new(Mutex::new(None));
        let running = Arc::new(AtomicBool::new(true));
        let topic = config.topic.clone();
        let thread_latest = latest.clone();
        let thread_running = running.clone();
        let join_handle = std::thread::spawn(move || {
            let mut last_timestamp = None;
            while thread_running.load(Ordering::SeqCst) {
                match notifications.recv_timeout(NOTIFICATION_POLL) {
                    Ok(Notification::Publish(message)) => {
                        handle_publish(
                            &message.topic_name,
                            &topic,
                            &message.payload,
                            &mut last_timestamp,
                            &thread_latest,
                        );
                    }
                    Ok(_) => {}
                    Err(error) if error.is_timeout() => {}
                    Err(_) => {
                        warn!("MQTT notification channel closed");
                        break;
                    }
                }
            }
            debug!("Landmark subscriber stopped");
        });

        Ok(Self {
            latest,
            running,
            client: Some(client),
            join_handle: Some(join_handle),
        })
    }
}

impl LandmarkSource for MqttLandmarkSource {
    fn poll(&mut self) -> Option<TimestampedFrame> {
        lock(&self.latest).take()
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(join_handle) = self.join_handle.take() {
            if join_handle.join().is_err() {
                warn!("Landmark subscriber thread panicked");
            }
        }
        if self.client.take().is_some() {
            info!("Disconnected from MQTT");
        }
    }
}

impl Drop for MqttLandmarkSource {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PublishOutcome {
    Accepted,
    OtherTopic,
    Malformed,
    Stale,
}

/// Decode one publish and store it as the newest frame if it is in order.
fn handle_publish(
    topic: &str,
    expected: &str,
    payload: &[u8],
    last: &mut Option<u64>,
    latest: &LatestFrame,
) -> PublishOutcome {
    if topic != expected {
        return PublishOutcome::OtherTopic;
    }
    match TimestampedFrame::deserialize(payload) {
        Ok(frame) => {
            if accept_in_order(last, frame.timestamp_ms) {
                *lock(latest) = Some(frame);
                PublishOutcome::Accepted
            } else {
                trace!("Dropping stale frame {}", frame.timestamp_ms);
                PublishOutcome::Stale
            }
        }
        Err(error) => {
            warn!("Malformed landmark message: {}", error);
            PublishOutcome::Malformed
        }
    }
}

/// Keeps timestamps non decreasing. Returns false for frames older than the last one.
fn accept_in_order(last: &mut Option<u64>, timestamp_ms: u64) -> bool {
    match *last {
        Some(previous) if timestamp_ms < previous => false,
        _ => {
            *last = Some(timestamp_ms);
            true
        }
    }
}

/// Plays back a recording of estimator messages, one per `poll`.
pub struct ReplaySource {
    frames: VecDeque<TimestampedFrame>,
}

impl ReplaySource {
    pub fn new(frames: impl IntoIterator<Item = TimestampedFrame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    /// Read a JSON lines recording. Blank lines are skipped.
    pub fn from_reader(reader: impl BufRead) -> Result<Self, SourceError> {
        let mut frames = VecDeque::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let frame = TimestampedFrame::deserialize(line.as_bytes()).map_err(|source| {
                SourceError::Recording {
                    line: index + 1,
                    source,
                }
            })?;
            frames.push_back(frame);
        }
        info!("Loaded {} recorded frames", frames.len());
        Ok(Self { frames })
    }

    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, SourceError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl LandmarkSource for ReplaySource {
    fn poll(&mut self) -> Option<TimestampedFrame> {
        self.frames.pop_front()
    }

    fn stop(&mut self) {
        self.frames.clear();
    }
}
