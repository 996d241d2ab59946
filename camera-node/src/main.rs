use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use reolink_camera::config::{NodeConfig, ENV_PREFIX};
use reolink_camera::{Camera, ReolinkCamera};
use serde_json::Value;
use std::path::PathBuf;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "config/reolink.yaml")]
    config: String,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Check the camera attributes without contacting the device
    Validate,

    /// Grab one still frame and write it as JPEG
    Snapshot {
        #[arg(short, long, default_value = "snapshot.jpg")]
        output: PathBuf,
    },

    /// Run named commands, e.g. '{"ptz_go_to_preset": {"id": 1}}'
    Command { json: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level)?;

    let config = NodeConfig::load(&args.config, ENV_PREFIX)?;

    if let Action::Validate = args.action {
        let warnings = ReolinkCamera::validate_config(&config.attributes)?;
        for warning in &warnings {
            println!("warning: {}", warning);
        }
        println!("{}: configuration is valid", config.name);
        return Ok(());
    }

    let camera = ReolinkCamera::new(config.name.clone());
    camera.reconfigure(&config.attributes).await?;
    info!("Camera {} ready", camera.name());

    let outcome = run(&camera, args.action).await;

    if let Err(e) = camera.close().await {
        error!("Failed to close camera: {}", e);
    }

    outcome
}

async fn run(camera: &ReolinkCamera, action: Action) -> Result<()> {
    match action {
        Action::Validate => Ok(()),
        Action::Snapshot { output } => {
            let image = camera.get_image(mime::IMAGE_JPEG.as_ref()).await?;
            tokio::fs::write(&output, &image.data)
                .await
                .with_context(|| format!("writing {}", output.display()))?;
            info!("Wrote {} bytes ({}) to {}", image.len(), image.mime_type, output.display());
            Ok(())
        }
        Action::Command { json } => {
            let request = match serde_json::from_str::<Value>(&json)? {
                Value::Object(map) => map,
                _ => return Err(anyhow!("command must be a JSON object")),
            };

            let results = camera.do_command(&request).await?;
            println!("{}", serde_json::to_string_pretty(&Value::Object(results.into_json()))?);
            Ok(())
        }
    }
}

fn init_logging(level: &str) -> Result<()> {
    let log_level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}
