use crate::config::{ViewerConfig, app_name, version};
use crate::decoder::{DecoderOutput, VideoDecoder};
use crate::net::WsConnector;
use crate::pipeline::{PipelineStage, ViewerCoordinator};
use crate::view::{DiscardSink, LogView, RenderSink, YuvFileSink};
use log::info;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub mod assets;
pub mod config;
pub mod control;
pub mod decoder;
pub mod demux;
pub mod error;
pub mod net;
pub mod pipeline;
pub mod protocol;
pub mod view;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let matches = config::command().get_matches();
    let config = ViewerConfig::from_matches(&matches)?;

    // first Ctrl-C tears the session down, a second one exits immediately
    let cancel = CancellationToken::new();
    let signal = cancel.clone();
    ctrlc::set_handler(move || {
        if signal.is_cancelled() {
            std::process::exit(130);
        }
        signal.cancel();
    })?;

    let (decoder_tx, decoder_rx) = mpsc::unbounded_channel();
    let decoder = create_decoder(decoder_tx)?;

    let sink: Box<dyn RenderSink> = match &config.dump_path {
        Some(path) => {
            info!("Dumping decoded frames to {}", path.display());
            Box::new(YuvFileSink::create(path)?)
        }
        None => Box::new(DiscardSink::new()),
    };

    info!("{} v{}", app_name(), version());
    let mut coordinator = ViewerCoordinator::new(
        config,
        Box::new(WsConnector),
        decoder,
        decoder_rx,
        Box::new(LogView::new()),
        sink,
        cancel,
    );
    coordinator.run().await
}

#[cfg(feature = "ffmpeg")]
fn create_decoder(output: DecoderOutput) -> anyhow::Result<Box<dyn VideoDecoder>> {
    Ok(Box::new(decoder::FfmpegDecoder::new(output)))
}

#[cfg(not(feature = "ffmpeg"))]
fn create_decoder(_output: DecoderOutput) -> anyhow::Result<Box<dyn VideoDecoder>> {
    anyhow::bail!("{} was built without a video decoder, enable the `ffmpeg` feature", app_name())
}
