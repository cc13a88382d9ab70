//! Generate a single image from a text prompt.
//!
//! Requires a running Axera service at http://m5:5000
//! (override with the AXERA_URL environment variable).
//!
//! ```sh
//! cargo run --example simple_generation
//! ```

use axera_rs::{AxeraClient, GenerationRequest, GenerationResult};
use std::path::Path;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let url = std::env::var("AXERA_URL").unwrap_or_else(|_| "http://m5:5000".to_string());
    let client = AxeraClient::new(url);

    // Check connection
    if !client.health().await? {
        eprintln!("Axera is not responding");
        return Ok(());
    }
    println!("Axera is online at {}", client.base_url());

    let request = GenerationRequest::txt2img("a beautiful sunset over mountains");

    match client.generate(&request).await {
        GenerationResult::Success(success) => {
            println!("Seed: {:?}", success.seed);
            println!("Took {:?} ms", success.total_time_ms);
            success.image.save(Path::new("sunset.png"))?;
            println!("Saved: sunset.png");
        }
        GenerationResult::Failure { message } => eprintln!("Generation failed: {}", message),
    }

    Ok(())
}
