//! Feed an image through several img2img cycles, each cycle starting from
//! the previous cycle's output.
//!
//! ```sh
//! cargo run --example recursive_img2img -- face.png 4
//! ```

use axera_rs::{AxeraClient, GenerationLoop, GenerationRequest, ImageData, RecursiveOptions};
use futures_util::StreamExt;
use std::path::Path;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let input = args.next().unwrap_or_else(|| "face.png".to_string());
    let cycles: u32 = args.next().map(|n| n.parse()).transpose()?.unwrap_or(3);

    let client = AxeraClient::new("http://m5:5000");
    let start = ImageData::open(Path::new(&input))?;

    let request = GenerationRequest::img2img("a weathered sea captain", start)
        .seed(1234)
        .denoising_strength(0.25);
    let run = GenerationLoop::builder(request)
        .portrait_enhancer(true)
        .recursive(RecursiveOptions::cycles(cycles))
        .build()?;

    let mut outcomes = Box::pin(run.run(&client));
    while let Some(outcome) = outcomes.next().await {
        match outcome.image() {
            Some(image) => {
                let name = format!("cycle_{}.png", outcome.cycle);
                image.save(Path::new(&name))?;
                println!("{} -> {}\n{}", outcome.cycle_label(), name, outcome.display_text());
            }
            None => eprintln!("{} failed: {}", outcome.cycle_label(), outcome.display_text()),
        }
    }

    Ok(())
}
