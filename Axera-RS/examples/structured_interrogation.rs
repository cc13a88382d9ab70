//! Ask the service to pick labels for an image from fixed vocabularies.
//!
//! ```sh
//! cargo run --example structured_interrogation -- photo.jpg
//! ```

use axera_rs::{AxeraClient, Categories, ImageData, InterrogationRequest};
use std::path::Path;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "photo.jpg".to_string());
    let client = AxeraClient::new("http://m5:5000");

    // JPEGs are converted to PNG before upload
    let image = ImageData::open(Path::new(&path))?;

    let standard = client
        .interrogate_request(&InterrogationRequest::standard(image.clone()))
        .await;
    println!("Standard:\n{}", serde_json::to_string_pretty(&standard)?);

    let categories = Categories::from_rows([
        ("gender", "man, woman"),
        ("hair", "black, blonde, pink"),
    ]);
    let structured = client
        .interrogate_request(&InterrogationRequest::structured(image, categories))
        .await;
    println!("Structured:\n{}", serde_json::to_string_pretty(&structured)?);

    Ok(())
}
