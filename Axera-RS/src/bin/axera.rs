//! Command-line front end for the Axera service.
//!
//! ```sh
//! axera --url http://m5:5000 generate "a red fox in the snow" --seed 42
//! axera generate "a knight" --mode img2img --init-image face.png --cycles 4 --portrait
//! axera interrogate photo.png --category gender=man,woman --category hair=black,blonde
//! ```
//!
//! Set `RUST_LOG=axera_rs=debug` to see every request.

use anyhow::{anyhow, bail, Context};
use axera_rs::{
    AxeraClient, Categories, ClientConfig, GenerationLoop, GenerationRequest, ImageData, Mode,
    RecursiveOptions, ResizeMode, Seed,
};
use clap::{Args, Parser, Subcommand};
use futures_util::StreamExt;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "axera", version, about = "Generate and interrogate images on an Axera service")]
struct Cli {
    /// Service base URL (overrides the config file)
    #[arg(long, env = "AXERA_URL", global = true)]
    url: Option<String>,

    /// TOML config file with base_url and timeouts
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run txt2img, img2img, or a recursive img2img loop
    Generate(GenerateArgs),
    /// Describe an image, optionally against label categories
    Interrogate(InterrogateArgs),
    /// Check that the service is reachable
    Health,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Text prompt
    prompt: String,

    /// txt2img or img2img
    #[arg(long, default_value = "txt2img")]
    mode: Mode,

    /// Seed; omit or pass -1 for random
    #[arg(long, allow_negative_numbers = true)]
    seed: Option<Seed>,

    /// Starting image for img2img (any common format, sent as PNG)
    #[arg(long)]
    init_image: Option<PathBuf>,

    /// Denoising strength in [0, 1]
    #[arg(long, default_value_t = 0.5)]
    strength: f32,

    /// stretch, crop or pad
    #[arg(long, default_value = "stretch")]
    resize: ResizeMode,

    /// Wrap the prompt in the portrait template
    #[arg(long)]
    portrait: bool,

    /// Run recursively for N cycles (img2img needs N >= 2; txt2img runs once)
    #[arg(long, value_name = "N")]
    cycles: Option<u32>,

    /// Directory for the generated PNGs
    #[arg(long, short, default_value = ".")]
    out_dir: PathBuf,
}

#[derive(Args, Debug)]
struct InterrogateArgs {
    /// Image to describe
    image: PathBuf,

    /// Structured category as name=label,label (repeatable)
    #[arg(long = "category", value_name = "NAME=LABELS")]
    categories: Vec<String>,

    /// Force structured mode even without --category
    #[arg(long)]
    structured: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let client = build_client(&cli)?;

    match cli.command {
        Command::Generate(args) => generate(&client, args).await,
        Command::Interrogate(args) => interrogate(&client, args).await,
        Command::Health => {
            let healthy = client
                .health()
                .await
                .with_context(|| format!("Axera at {} is not reachable", client.base_url()))?;
            if !healthy {
                bail!("Axera at {} answered with a server error", client.base_url());
            }
            println!("Axera at {} is online", client.base_url());
            Ok(())
        }
    }
}

fn build_client(cli: &Cli) -> anyhow::Result<AxeraClient> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => ClientConfig::default(),
    };
    if let Some(url) = &cli.url {
        config = ClientConfig::builder()
            .with_base_url(url.clone())
            .with_generate_timeout(config.generate_timeout)
            .with_interrogate_timeout(config.interrogate_timeout)
            .build()?;
    }
    log::debug!("using Axera at {}", config.base_url);
    Ok(AxeraClient::with_config(config))
}

async fn generate(client: &AxeraClient, args: GenerateArgs) -> anyhow::Result<()> {
    let init_image = args
        .init_image
        .as_deref()
        .map(ImageData::open)
        .transpose()
        .context("failed to read init image")?;
    if args.mode == Mode::Img2Img && init_image.is_none() {
        bail!("img2img needs --init-image");
    }

    let request = GenerationRequest::txt2img(args.prompt)
        .mode(args.mode)
        .with_seed(args.seed.unwrap_or_default())
        .init_image(init_image)
        .denoising_strength(args.strength)
        .resize_mode(args.resize);
    let recursive = args
        .cycles
        .map(RecursiveOptions::cycles)
        .unwrap_or_default();
    let run = GenerationLoop::builder(request)
        .portrait_enhancer(args.portrait)
        .recursive(recursive)
        .build()?;

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("cannot create {}", args.out_dir.display()))?;

    let mut cycles = Box::pin(run.run(client));
    let mut failure = None;
    while let Some(outcome) = cycles.next().await {
        match outcome.image() {
            Some(image) => {
                let path = args.out_dir.join(format!(
                    "axera_{:02}_of_{:02}.png",
                    outcome.cycle, outcome.total_cycles
                ));
                image
                    .save(&path)
                    .with_context(|| format!("cannot write {}", path.display()))?;
                println!("[{}] saved {}", outcome.cycle_label(), path.display());
                println!("{}", outcome.display_text());
            }
            None => {
                eprintln!(
                    "[{}] seed {}: {}",
                    outcome.cycle_label(),
                    outcome.original_seed,
                    outcome.display_text()
                );
                failure = Some(outcome.display_text());
            }
        }
    }

    match failure {
        Some(message) => Err(anyhow!(message)),
        None => Ok(()),
    }
}

async fn interrogate(client: &AxeraClient, args: InterrogateArgs) -> anyhow::Result<()> {
    let image = ImageData::open(&args.image)
        .with_context(|| format!("failed to read {}", args.image.display()))?;

    let result = if args.structured || !args.categories.is_empty() {
        let rows = args
            .categories
            .iter()
            .map(|spec| {
                spec.split_once('=')
                    .ok_or_else(|| anyhow!("category '{}' is not NAME=LABELS", spec))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        client
            .interrogate_structured(&image, &Categories::from_rows(rows))
            .await
    } else {
        client.interrogate(&image).await
    };

    println!("{}", serde_json::to_string_pretty(&result)?);
    if result.get("error").is_some() {
        bail!("interrogation failed");
    }
    Ok(())
}
