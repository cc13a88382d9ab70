//! Recursive image-to-image generation.
//!
//! A [`GenerationLoop`] runs one or more generation cycles and feeds each
//! cycle's output image back in as the next cycle's init image. Results are
//! surfaced one per cycle as a [`Stream`], so a caller can show cycle 1
//! while cycle 2 is still rendering.

use futures_util::stream::{self, Stream, StreamExt};
use serde::Serialize;

use crate::client::ImageService;
use crate::error::{AxeraError, Result};
use crate::imaging::ImageData;
use crate::prompt::effective_prompt;
use crate::types::{GenerationRequest, GenerationResult, Mode, Seed};

/// Recursion settings. Only honored in img2img mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecursiveOptions {
    pub enabled: bool,
    /// Total cycles to run for recursive img2img; at least 2 there, and
    /// ignored for txt2img.
    pub cycles: u32,
}

impl Default for RecursiveOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            cycles: 2,
        }
    }
}

impl RecursiveOptions {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn cycles(cycles: u32) -> Self {
        Self {
            enabled: true,
            cycles,
        }
    }
}

/// Display metadata for a completed cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleMetadata {
    #[serde(rename = "Cycle")]
    pub cycle_label: String,
    #[serde(rename = "Seed")]
    pub seed: Option<i64>,
    #[serde(rename = "Total Time (ms)")]
    pub total_time_ms: Option<f64>,
    #[serde(rename = "Text Time (ms)")]
    pub text_time_ms: Option<f64>,
}

impl CycleMetadata {
    /// Pretty-printed JSON, two-space indented.
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// What a single cycle produced.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleResult {
    Completed {
        image: ImageData,
        metadata: CycleMetadata,
    },
    Failed {
        message: String,
    },
}

/// One emitted item of a loop run.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutcome {
    /// 1-based cycle index.
    pub cycle: u32,
    pub total_cycles: u32,
    /// The seed the caller asked for. Stays [`Seed::Random`] for random runs
    /// even though the server picks a different concrete seed each cycle.
    pub original_seed: Seed,
    /// Init image sent in this cycle.
    pub input_image: Option<ImageData>,
    pub result: CycleResult,
}

impl CycleOutcome {
    /// `"i/N"`.
    pub fn cycle_label(&self) -> String {
        format!("{}/{}", self.cycle, self.total_cycles)
    }

    pub fn image(&self) -> Option<&ImageData> {
        match &self.result {
            CycleResult::Completed { image, .. } => Some(image),
            CycleResult::Failed { .. } => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.result, CycleResult::Failed { .. })
    }

    /// Text for a metadata panel: the metadata JSON, or the failure message.
    pub fn display_text(&self) -> String {
        match &self.result {
            CycleResult::Completed { metadata, .. } => metadata.to_pretty_json(),
            CycleResult::Failed { message } => message.clone(),
        }
    }
}

/// Per-run state. Lives only inside one `run` stream.
struct CycleState {
    cycle: u32,
    current_seed: Seed,
    current_init_image: Option<ImageData>,
}

/// Runs one or more generation cycles over an [`ImageService`].
///
/// # Example
/// ```no_run
/// use axera_rs::{AxeraClient, GenerationLoop, GenerationRequest, ImageData, RecursiveOptions};
/// use futures_util::StreamExt;
/// use std::path::Path;
///
/// # async fn example() -> axera_rs::Result<()> {
/// let client = AxeraClient::new("http://m5:5000");
/// let start = ImageData::open(Path::new("face.png"))?;
///
/// let run = GenerationLoop::builder(GenerationRequest::img2img("a knight", start))
///     .portrait_enhancer(true)
///     .recursive(RecursiveOptions::cycles(4))
///     .build()?;
///
/// let mut cycles = Box::pin(run.run(&client));
/// while let Some(outcome) = cycles.next().await {
///     println!("{}: {}", outcome.cycle_label(), outcome.display_text());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct GenerationLoop {
    request: GenerationRequest,
    portrait_enhancer: bool,
    recursive: RecursiveOptions,
}

impl GenerationLoop {
    /// Start building a loop around a base request.
    pub fn builder(request: GenerationRequest) -> GenerationLoopBuilder {
        GenerationLoopBuilder::new(request)
    }

    pub fn request(&self) -> &GenerationRequest {
        &self.request
    }

    /// Number of cycles a run will attempt: the configured count for
    /// recursive img2img, otherwise 1.
    pub fn total_cycles(&self) -> u32 {
        if self.recursive.enabled && self.request.mode == Mode::Img2Img {
            self.recursive.cycles
        } else {
            1
        }
    }

    /// Lazily run the cycles, yielding one [`CycleOutcome`] per cycle.
    ///
    /// Each call starts from the base request again. The stream ends after
    /// the last cycle or right after the first failed one; a cycle never
    /// starts before the previous one has returned.
    pub fn run<'a, S>(&'a self, service: &'a S) -> impl Stream<Item = CycleOutcome> + Send + 'a
    where
        S: ImageService + ?Sized,
    {
        let total = self.total_cycles();
        let initial = CycleState {
            cycle: 1,
            current_seed: self.request.seed,
            current_init_image: self.request.init_image.clone(),
        };

        stream::unfold(Some(initial), move |state| async move {
            let Some(mut state) = state else {
                return None;
            };
            if state.cycle > total {
                return None;
            }

            let request = GenerationRequest {
                prompt: effective_prompt(&self.request.prompt, self.portrait_enhancer),
                seed: state.current_seed,
                init_image: state.current_init_image.clone(),
                ..self.request.clone()
            };
            log::debug!("[axera-rs] cycle {}/{} starting", state.cycle, total);

            let input_image = state.current_init_image.clone();
            match service.generate(&request).await {
                GenerationResult::Success(success) => {
                    let metadata = CycleMetadata {
                        cycle_label: format!("{}/{}", state.cycle, total),
                        seed: success.seed,
                        total_time_ms: success.total_time_ms,
                        text_time_ms: success.text_time_ms,
                    };
                    let outcome = CycleOutcome {
                        cycle: state.cycle,
                        total_cycles: total,
                        original_seed: self.request.seed,
                        input_image,
                        result: CycleResult::Completed {
                            image: success.image.clone(),
                            metadata,
                        },
                    };
                    if total > 1 {
                        state.current_init_image = Some(success.image);
                    }
                    state.cycle += 1;
                    Some((outcome, Some(state)))
                }
                GenerationResult::Failure { message } => {
                    log::warn!(
                        "[axera-rs] cycle {}/{} failed, stopping: {}",
                        state.cycle,
                        total,
                        message
                    );
                    let outcome = CycleOutcome {
                        cycle: state.cycle,
                        total_cycles: total,
                        original_seed: self.request.seed,
                        input_image,
                        result: CycleResult::Failed { message },
                    };
                    Some((outcome, None))
                }
            }
        })
    }

    /// Run to completion and gather every outcome.
    pub async fn collect<S>(&self, service: &S) -> Vec<CycleOutcome>
    where
        S: ImageService + ?Sized,
    {
        self.run(service).collect().await
    }
}

/// Builder for [`GenerationLoop`].
#[derive(Debug, Clone)]
pub struct GenerationLoopBuilder {
    request: GenerationRequest,
    portrait_enhancer: bool,
    recursive: RecursiveOptions,
}

impl GenerationLoopBuilder {
    pub fn new(request: GenerationRequest) -> Self {
        Self {
            request,
            portrait_enhancer: false,
            recursive: RecursiveOptions::disabled(),
        }
    }

    /// Wrap the prompt in the portrait template every cycle.
    pub fn portrait_enhancer(mut self, enabled: bool) -> Self {
        self.portrait_enhancer = enabled;
        self
    }

    pub fn recursive(mut self, options: RecursiveOptions) -> Self {
        self.recursive = options;
        self
    }

    /// Build the loop. Recursive img2img with fewer than 2 cycles is
    /// rejected; txt2img always runs once, whatever the count.
    pub fn build(self) -> Result<GenerationLoop> {
        if self.recursive.enabled
            && self.request.mode == Mode::Img2Img
            && self.recursive.cycles < 2
        {
            return Err(AxeraError::InvalidConfig(format!(
                "recursive mode needs at least 2 cycles, got {}",
                self.recursive.cycles
            )));
        }
        Ok(GenerationLoop {
            request: self.request,
            portrait_enhancer: self.portrait_enhancer,
            recursive: self.recursive,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GenerationSuccess;
    use async_trait::async_trait;
    use image::{DynamicImage, Rgb, RgbImage};
    use std::sync::Mutex;

    fn png(shade: u8) -> ImageData {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([shade, shade, shade])));
        ImageData::from_dynamic(&img).unwrap()
    }

    /// Returns a new image per call and fails on `fail_on` (1-based).
    struct Scripted {
        fail_on: Option<usize>,
        calls: Mutex<Vec<GenerationRequest>>,
    }

    impl Scripted {
        fn new(fail_on: Option<usize>) -> Self {
            Self {
                fail_on,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<GenerationRequest> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ImageService for Scripted {
        async fn generate(&self, request: &GenerationRequest) -> GenerationResult {
            let n = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(request.clone());
                calls.len()
            };
            if self.fail_on == Some(n) {
                return GenerationResult::Failure {
                    message: "Error: out of memory".into(),
                };
            }
            GenerationResult::Success(GenerationSuccess {
                image: png(n as u8 * 10),
                seed: Some(1000 + n as i64),
                total_time_ms: Some(500.0),
                text_time_ms: Some(20.0),
            })
        }
    }

    #[test]
    fn test_total_cycles() {
        let i2i = GenerationRequest::img2img("x", png(1));
        let run = GenerationLoop::builder(i2i.clone())
            .recursive(RecursiveOptions::cycles(5))
            .build()
            .unwrap();
        assert_eq!(run.total_cycles(), 5);

        let run = GenerationLoop::builder(i2i).build().unwrap();
        assert_eq!(run.total_cycles(), 1);

        let run = GenerationLoop::builder(GenerationRequest::txt2img("x"))
            .recursive(RecursiveOptions::cycles(5))
            .build()
            .unwrap();
        assert_eq!(run.total_cycles(), 1);
    }

    #[test]
    fn test_too_few_cycles_rejected() {
        let result = GenerationLoop::builder(GenerationRequest::img2img("x", png(1)))
            .recursive(RecursiveOptions::cycles(1))
            .build();
        assert!(matches!(result, Err(AxeraError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_txt2img_runs_once_for_any_cycle_count() {
        for cycles in [0, 1] {
            let service = Scripted::new(None);
            let run = GenerationLoop::builder(GenerationRequest::txt2img("x"))
                .recursive(RecursiveOptions::cycles(cycles))
                .build()
                .unwrap();
            assert_eq!(run.total_cycles(), 1);

            let outcomes = run.collect(&service).await;
            assert_eq!(outcomes.len(), 1, "cycles = {}", cycles);
            assert_eq!(outcomes[0].cycle_label(), "1/1");
            assert!(!outcomes[0].is_failure());
            assert_eq!(service.calls().len(), 1);
        }
    }

    #[tokio::test]
    async fn test_images_threaded_between_cycles() {
        let start = png(1);
        let service = Scripted::new(None);
        let run = GenerationLoop::builder(GenerationRequest::img2img("a fox", start.clone()))
            .recursive(RecursiveOptions::cycles(3))
            .build()
            .unwrap();

        let outcomes = run.collect(&service).await;
        let calls = service.calls();
        assert_eq!(outcomes.len(), 3);
        assert_eq!(calls.len(), 3);

        assert_eq!(calls[0].init_image.as_ref(), Some(&start));
        for i in 0..2 {
            assert_eq!(calls[i + 1].init_image.as_ref(), outcomes[i].image());
            assert_eq!(outcomes[i + 1].input_image.as_ref(), outcomes[i].image());
        }
        let labels: Vec<String> = outcomes.iter().map(|o| o.cycle_label()).collect();
        assert_eq!(labels, ["1/3", "2/3", "3/3"]);
    }

    #[tokio::test]
    async fn test_failure_stops_loop() {
        let service = Scripted::new(Some(2));
        let run = GenerationLoop::builder(GenerationRequest::img2img("x", png(1)))
            .recursive(RecursiveOptions::cycles(5))
            .build()
            .unwrap();

        let outcomes = run.collect(&service).await;
        assert_eq!(outcomes.len(), 2);
        assert_eq!(service.calls().len(), 2);
        assert!(!outcomes[0].is_failure());
        assert!(outcomes[1].is_failure());
        assert_eq!(outcomes[1].display_text(), "Error: out of memory");
        assert!(outcomes[1].image().is_none());
        assert_eq!(outcomes[1].input_image.as_ref(), outcomes[0].image());
    }

    #[tokio::test]
    async fn test_random_seed_preserved_for_display() {
        let service = Scripted::new(None);
        let run = GenerationLoop::builder(GenerationRequest::img2img("x", png(1)))
            .recursive(RecursiveOptions::cycles(3))
            .build()
            .unwrap();

        let outcomes = run.collect(&service).await;
        for outcome in &outcomes {
            assert_eq!(outcome.original_seed, Seed::Random);
            assert_eq!(outcome.original_seed.to_string(), "-1");
        }
        assert!(service.calls().iter().all(|c| c.seed == Seed::Random));
        match &outcomes[2].result {
            CycleResult::Completed { metadata, .. } => assert_eq!(metadata.seed, Some(1003)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fixed_seed_sent_every_cycle() {
        let service = Scripted::new(None);
        let run = GenerationLoop::builder(GenerationRequest::img2img("x", png(1)).seed(77))
            .recursive(RecursiveOptions::cycles(4))
            .build()
            .unwrap();

        run.collect(&service).await;
        let calls = service.calls();
        assert_eq!(calls.len(), 4);
        assert!(calls.iter().all(|c| c.seed == Seed::Fixed(77)));
    }

    #[tokio::test]
    async fn test_portrait_prompt_every_cycle() {
        let service = Scripted::new(None);
        let run = GenerationLoop::builder(GenerationRequest::img2img("a fox", png(1)))
            .portrait_enhancer(true)
            .recursive(RecursiveOptions::cycles(3))
            .build()
            .unwrap();

        run.collect(&service).await;
        for call in service.calls() {
            assert_eq!(call.prompt, "adult, face portrait photograph, a fox, 8k, realistic");
        }
    }

    #[tokio::test]
    async fn test_single_cycle_keeps_input() {
        let start = png(1);
        let service = Scripted::new(None);
        let run = GenerationLoop::builder(GenerationRequest::img2img("x", start.clone()))
            .build()
            .unwrap();

        let outcomes = run.collect(&service).await;
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].input_image.as_ref(), Some(&start));
        assert_eq!(outcomes[0].cycle_label(), "1/1");
    }

    #[tokio::test]
    async fn test_runs_are_independent() {
        let service = Scripted::new(None);
        let start = png(1);
        let run = GenerationLoop::builder(GenerationRequest::img2img("x", start.clone()))
            .recursive(RecursiveOptions::cycles(2))
            .build()
            .unwrap();

        run.collect(&service).await;
        run.collect(&service).await;
        let calls = service.calls();
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[2].init_image.as_ref(), Some(&start));
    }

    #[tokio::test]
    async fn test_stream_is_lazy() {
        let service = Scripted::new(None);
        let run = GenerationLoop::builder(GenerationRequest::img2img("x", png(1)))
            .recursive(RecursiveOptions::cycles(10))
            .build()
            .unwrap();

        let first: Vec<CycleOutcome> = run.run(&service).take(2).collect().await;
        assert_eq!(first.len(), 2);
        assert_eq!(service.calls().len(), 2);
    }

    #[test]
    fn test_metadata_json_keys() {
        let metadata = CycleMetadata {
            cycle_label: "2/4".into(),
            seed: Some(5),
            total_time_ms: Some(1500.0),
            text_time_ms: Some(12.5),
        };
        let value: serde_json::Value = serde_json::from_str(&metadata.to_pretty_json()).unwrap();
        assert_eq!(value["Cycle"], "2/4");
        assert_eq!(value["Seed"], 5);
        assert_eq!(value["Total Time (ms)"], 1500.0);
        assert_eq!(value["Text Time (ms)"], 12.5);
        assert!(metadata.to_pretty_json().contains("\n  \"Cycle\""));
    }
}
