//! CLI for sora-async - submit, poll and download a Sora video.

use clap::Parser;
use sora_async::video::{DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_SECONDS, DEFAULT_SIZE};
use sora_async::{DownloadOptions, GenerationConfig, PollPolicy, SoraClient, VideoRequest};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "sora-async")]
#[command(about = "Generate a video with Sora (text-to-video or image-to-video) and download it")]
#[command(version)]
struct Cli {
    /// The text prompt describing the video
    #[arg(env = "SORA_PROMPT")]
    prompt: String,

    /// Reference image for image-to-video (falls back to text-to-video if missing)
    #[arg(short, long, env = "SORA_IMAGE")]
    image: Option<PathBuf>,

    /// Model identifier
    #[arg(short, long, env = "SORA_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Resolution, e.g. 1280x720 or 720x1280
    #[arg(long, env = "SORA_SIZE", default_value = DEFAULT_SIZE)]
    size: String,

    /// Video duration in seconds
    #[arg(short, long, env = "SORA_SECONDS", default_value_t = DEFAULT_SECONDS)]
    seconds: u32,

    /// API key (falls back to OPENAI_API_KEY)
    #[arg(long, env = "SORA_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Videos endpoint
    #[arg(long, env = "SORA_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Seconds between status queries
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    poll_interval: u64,

    /// Give up polling after this many seconds
    #[arg(long, default_value_t = 600, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: u64,

    /// Output file path (default: derived from the job id and mode)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory for the derived output file name
    #[arg(long, env = "SORA_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn config(&self) -> GenerationConfig {
        let mut request = VideoRequest::new(&self.prompt)
            .with_model(&self.model)
            .with_size(&self.size)
            .with_seconds(self.seconds);
        if let Some(ref image) = self.image {
            request = request.with_image(image);
        }

        let mut download = DownloadOptions::default().with_output_dir(&self.output_dir);
        if let Some(ref output) = self.output {
            download = download.with_output_path(output);
        }

        GenerationConfig::new(request)
            .with_poll_policy(
                PollPolicy::default()
                    .with_interval(Duration::from_secs(self.poll_interval))
                    .with_timeout(Duration::from_secs(self.timeout)),
            )
            .with_download_options(download)
    }

    fn client(&self) -> sora_async::Result<SoraClient> {
        let mut builder = SoraClient::builder().base_url(&self.base_url);
        if let Some(ref key) = self.api_key {
            builder = builder.api_key(key);
        }
        builder.build()
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let client = cli.client()?;
    let config = cli.config();

    let report = tokio::select! {
        result = sora_async::run(&client, &config) => result?,
        _ = tokio::signal::ctrl_c() => {
            anyhow::bail!("interrupted before the video was downloaded");
        }
    };

    if cli.json {
        let result = serde_json::json!({
            "type": "video",
            "success": true,
            "report": report,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "Generated video: {} ({} bytes) via {} [{}]",
            report.output.display(),
            report.size_bytes,
            report.model,
            report.mode
        );
        println!("Video ID: {}", report.video_id);
        if let Some(ref url) = report.url {
            println!("URL: {}", url);
        }
        println!("Generation time: {}ms", report.duration_ms);
    }

    Ok(())
}
