//! Viewer coordinator
//!
//! Owns every piece of mutable state and drives it from a single task:
//! transport events, decoder output, the stats tick and the reconnect timer
//! are multiplexed with `select!`, so no handler ever runs concurrently with
//! another.

use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, error, info, warn};
use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::ViewerConfig;
use crate::control::{ControlAction, ControlHandler};
use crate::decoder::{CodecFamily, DecodeGate, DecoderEvent, GateOutcome, VideoDecoder};
use crate::demux::Demuxer;
use crate::error::ViewerError;
use crate::net::{CloseAction, Connection, ConnectionEvent, Connector, Inbound, Session};
use crate::pipeline::PipelineStage;
use crate::pipeline::clock::{MediaClock, wall_clock_millis};
use crate::pipeline::state::SessionState;
use crate::pipeline::stats::StatsAggregator;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::view::{RenderSink, ViewEvents};

pub struct ViewerCoordinator {
    config: ViewerConfig,
    connector: Box<dyn Connector>,
    session: Session,
    connection: Option<Connection>,
    control: ControlHandler,
    demuxer: Demuxer,
    gate: DecodeGate,
    decoder_events: mpsc::UnboundedReceiver<DecoderEvent>,
    stats: StatsAggregator,
    view: Box<dyn ViewEvents>,
    sink: Box<dyn RenderSink>,
    reconnect_at: Option<time::Instant>,
    failure: Option<ViewerError>,
    cancel: CancellationToken,
}

impl ViewerCoordinator {
    /// `decoder_events` must be the receiving end of the channel `decoder` reports to.
    pub fn new(
        config: ViewerConfig,
        connector: Box<dyn Connector>,
        decoder: Box<dyn VideoDecoder>,
        decoder_events: mpsc::UnboundedReceiver<DecoderEvent>,
        view: Box<dyn ViewEvents>,
        sink: Box<dyn RenderSink>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            session: Session::new(config.max_reconnect_attempts, config.reconnect_delay),
            stats: StatsAggregator::with_windows(config.latency_window, config.fps_window),
            config,
            connector,
            connection: None,
            control: ControlHandler,
            demuxer: Demuxer::new(MediaClock::new()),
            gate: DecodeGate::new(decoder),
            decoder_events,
            view,
            sink,
            reconnect_at: None,
            failure: None,
            cancel,
        }
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    async fn connect(&mut self) {
        if !self.session.begin_connect() {
            return;
        }
        info!("Connecting to {}", self.config.endpoint.url);

        let result = tokio::select! {
            _ = self.cancel.cancelled() => return,
            result = self.connector.connect(&self.config.endpoint) => result,
        };

        match result {
            Ok(connection) => {
                self.connection = Some(connection);
                self.session.on_open();
                self.view.on_connect();
            }
            Err(e) => {
                warn!("Connection to {} failed: {}", self.config.endpoint.url, e);
                self.view.on_error(&e);
                self.handle_close(false);
            }
        }
    }

    /// Transport gone: forget per-connection state and ask the session what next.
    fn handle_close(&mut self, was_open: bool) {
        if let Some(connection) = self.connection.take() {
            connection.close();
        }
        self.gate.reset();
        self.stats.reset();
        if was_open {
            self.view.on_disconnect();
        }

        match self.session.on_close() {
            CloseAction::Reconnect { attempt, delay } => {
                info!("Reconnecting in {:?} (attempt {})", delay, attempt);
                self.reconnect_at = Some(time::Instant::now() + delay);
            }
            CloseAction::Fail { attempts } => {
                let err = ViewerError::ReconnectExhausted { attempts };
                error!("{}", err);
                self.view.on_error(&err);
                self.failure = Some(err);
            }
            CloseAction::Ignore => {}
        }
    }

    async fn handle_connection_event(&mut self, event: Option<ConnectionEvent>) {
        match event {
            Some(ConnectionEvent::Message(Inbound::Text(text))) => self.handle_text(&text).await,
            Some(ConnectionEvent::Message(Inbound::Binary(data))) => self.handle_media(data),
            Some(ConnectionEvent::Error(e)) => {
                warn!("{}", e);
                self.view.on_error(&e);
            }
            Some(ConnectionEvent::Closed) | None => {
                match self.session.state().open_duration() {
                    Some(uptime) => info!("Connection closed after {:?}", uptime),
                    None => info!("Connection closed"),
                }
                self.handle_close(true);
            }
        }
    }

    async fn handle_text(&mut self, text: &str) {
        let message = match ServerMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("{}", e);
                return;
            }
        };
        debug!("Control message: {}", message.kind());

        match self
            .control
            .handle(message, &mut self.stats, wall_clock_millis())
        {
            ControlAction::Configure(stream) => {
                let family = match CodecFamily::from_codec(&stream.codec) {
                    Ok(family) => family,
                    Err(e) => {
                        error!("Decoder setup failed: {}", e);
                        self.gate.close();
                        self.view.on_error(&e);
                        return;
                    }
                };
                self.demuxer.set_family(family);
                self.sink.resize(stream.width, stream.height);
                if let Err(e) = self.gate.configure(&stream).await {
                    error!("Decoder setup failed: {}", e);
                    self.view.on_error(&e);
                }
            }
            ControlAction::Reply(reply) => self.send(&reply),
            ControlAction::Report(e) => self.view.on_error(&e),
            ControlAction::None => {}
        }
    }

    fn handle_media(&mut self, fragment: Bytes) {
        self.stats.record_bytes_received(fragment.len());

        for unit in self.demuxer.demux(&fragment) {
            if let GateOutcome::Rejected(e) = self.gate.submit(unit) {
                warn!("{}", e);
                self.stats.record_decode_failure();
            }
        }
    }

    fn handle_decoder_event(&mut self, event: DecoderEvent) {
        match event {
            DecoderEvent::Frame { generation, frame } => {
                // output of a decoder released or replaced since
                if !self.gate.is_current(generation) {
                    debug!("Discarding frame from decoder generation {}", generation);
                    return;
                }
                self.stats.record_frame_decoded();
                if self.gate.note_frame() {
                    self.view.on_first_frame();
                }
                self.sink.render(frame);
            }
            DecoderEvent::Error(message) => {
                warn!("Decoder error: {}", message);
                self.stats.record_decode_failure();
            }
        }
    }

    /// Fire-and-forget; dropped unless the session is open.
    fn send(&self, message: &ClientMessage) {
        let Some(connection) = self.connection.as_ref().filter(|_| self.session.can_send())
        else {
            debug!("Not connected, dropping {:?}", message);
            return;
        };

        match message.to_text() {
            Ok(text) => {
                if !connection.send(text) {
                    debug!("Outbound queue full, dropping {:?}", message);
                }
            }
            Err(e) => warn!("Failed to encode {:?}: {}", message, e),
        }
    }

    fn emit_stats(&mut self) {
        let snapshot = self.stats.tick(
            Instant::now(),
            self.gate.units_submitted(),
            self.gate.units_dropped(),
        );
        self.view.on_stats(&snapshot);
    }
}

async fn next_event(connection: &mut Option<Connection>) -> Option<ConnectionEvent> {
    match connection {
        Some(connection) => connection.recv().await,
        None => std::future::pending().await,
    }
}

#[async_trait]
impl PipelineStage for ViewerCoordinator {
    async fn run(&mut self) -> Result<()> {
        self.connect().await;

        let mut stats_tick = time::interval(self.config.stats_interval);
        stats_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut stats_running = false;

        while !self.session.state().is_terminal() && !self.cancel.is_cancelled() {
            if !stats_running && self.session.state().is_open() {
                stats_tick.reset();
                stats_running = true;
            }

            let reconnect_at = self.reconnect_at;
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Viewer cancelled");
                }
                event = next_event(&mut self.connection) => {
                    self.handle_connection_event(event).await;
                }
                Some(event) = self.decoder_events.recv() => {
                    self.handle_decoder_event(event);
                }
                _ = stats_tick.tick(), if stats_running => {
                    self.emit_stats();
                }
                _ = time::sleep_until(reconnect_at.unwrap_or_else(time::Instant::now)), if reconnect_at.is_some() => {
                    self.reconnect_at = None;
                    self.connect().await;
                }
            }
        }

        self.shutdown().await?;

        match self.failure.take() {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    fn name(&self) -> &'static str {
        "ViewerCoordinator"
    }

    async fn shutdown(&mut self) -> Result<()> {
        let was_open = self.session.state().is_open();
        if let Some(connection) = self.connection.take() {
            connection.close();
        }
        self.reconnect_at = None;
        self.gate.close();
        self.session.close();
        if was_open {
            self.view.on_disconnect();
        }
        Ok(())
    }
}
