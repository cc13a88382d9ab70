//! # axera-rs
//!
//! Async Rust client for the Axera Stable Diffusion service, the small
//! HTTP API that runs txt2img, img2img and image interrogation on a
//! Pi-class accelerator board.
//!
//! Provides a typed client for the three service operations, a PNG/base64
//! image type with explicit codec boundaries, and a recursive img2img loop
//! that feeds every cycle's output back in as the next cycle's input,
//! yielding results one cycle at a time.
//!
//! ## Quick Start
//!
//! ```no_run
//! use axera_rs::{AxeraClient, Categories, GenerationRequest, GenerationResult};
//!
//! # async fn example() {
//! let client = AxeraClient::new("http://m5:5000");
//!
//! // txt2img with a random seed
//! let result = client
//!     .generate(&GenerationRequest::txt2img("a red fox in the snow"))
//!     .await;
//!
//! if let GenerationResult::Success(success) = result {
//!     println!("seed {:?} in {:?} ms", success.seed, success.total_time_ms);
//!
//!     // Ask the service what it sees
//!     let categories = Categories::from_rows([("animal", "fox, dog, cat")]);
//!     let answer = client
//!         .interrogate_structured(&success.image, &categories)
//!         .await;
//!     println!("{}", serde_json::to_string_pretty(&answer).unwrap());
//! }
//! # }
//! ```

pub mod categories;
pub mod client;
pub mod config;
pub mod error;
pub mod imaging;
pub mod prompt;
pub mod recursive;
pub mod types;

pub use categories::Categories;
pub use client::{AxeraClient, ImageService};
pub use config::{ClientConfig, ClientConfigBuilder, DEFAULT_BASE_URL};
pub use error::{AxeraError, Result};
pub use imaging::ImageData;
pub use prompt::{effective_prompt, enhance_portrait};
pub use recursive::{
    CycleMetadata, CycleOutcome, CycleResult, GenerationLoop, GenerationLoopBuilder,
    RecursiveOptions,
};
pub use types::{
    GenerationRequest, GenerationResult, GenerationSuccess, InterrogationRequest, Mode,
    ResizeMode, Seed,
};
