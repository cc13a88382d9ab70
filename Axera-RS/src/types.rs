use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::categories::Categories;
use crate::error::AxeraError;
use crate::imaging::ImageData;

/// Generation mode understood by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Synthesize from text only.
    #[default]
    Txt2Img,
    /// Condition on a starting image as well.
    Img2Img,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Txt2Img => "txt2img",
            Mode::Img2Img => "img2img",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = AxeraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "txt2img" => Ok(Mode::Txt2Img),
            "img2img" => Ok(Mode::Img2Img),
            other => Err(AxeraError::InvalidConfig(format!(
                "unknown mode '{}' (expected txt2img or img2img)",
                other
            ))),
        }
    }
}

/// How the service fits an init image to the output size.
///
/// Sent on the wire as its integer code (0, 1, 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ResizeMode {
    #[default]
    Stretch,
    Crop,
    Pad,
}

impl From<ResizeMode> for u8 {
    fn from(mode: ResizeMode) -> u8 {
        match mode {
            ResizeMode::Stretch => 0,
            ResizeMode::Crop => 1,
            ResizeMode::Pad => 2,
        }
    }
}

impl TryFrom<u8> for ResizeMode {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(ResizeMode::Stretch),
            1 => Ok(ResizeMode::Crop),
            2 => Ok(ResizeMode::Pad),
            other => Err(format!("unknown resize mode {}", other)),
        }
    }
}

impl FromStr for ResizeMode {
    type Err = AxeraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "0" | "stretch" => Ok(ResizeMode::Stretch),
            "1" | "crop" => Ok(ResizeMode::Crop),
            "2" | "pad" => Ok(ResizeMode::Pad),
            other => Err(AxeraError::InvalidConfig(format!(
                "unknown resize mode '{}' (expected stretch, crop or pad)",
                other
            ))),
        }
    }
}

/// Seed policy for a generation.
///
/// The wire format uses `-1` for "let the server pick"; that sentinel only
/// exists at the serialization boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Seed {
    /// The server assigns a fresh random seed on every request.
    #[default]
    Random,
    /// The exact seed to request.
    Fixed(i64),
}

impl Seed {
    /// Value sent in the `seed` field.
    pub fn wire_value(self) -> i64 {
        match self {
            Seed::Random => -1,
            Seed::Fixed(n) => n,
        }
    }

    /// Interpret a wire value; any negative number means random.
    pub fn from_wire(value: i64) -> Self {
        if value < 0 {
            Seed::Random
        } else {
            Seed::Fixed(value)
        }
    }

    pub fn is_random(self) -> bool {
        matches!(self, Seed::Random)
    }
}

impl From<i64> for Seed {
    fn from(value: i64) -> Self {
        Seed::from_wire(value)
    }
}

impl From<Option<i64>> for Seed {
    fn from(value: Option<i64>) -> Self {
        value.map(Seed::from_wire).unwrap_or(Seed::Random)
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wire_value())
    }
}

/// Blank input parses as [`Seed::Random`], like an emptied seed field.
impl FromStr for Seed {
    type Err = AxeraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Seed::Random);
        }
        s.parse::<i64>()
            .map(Seed::from_wire)
            .map_err(|e| AxeraError::InvalidConfig(format!("invalid seed '{}': {}", s, e)))
    }
}

impl Serialize for Seed {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.wire_value())
    }
}

impl<'de> Deserialize<'de> for Seed {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        i64::deserialize(deserializer).map(Seed::from_wire)
    }
}

const DEFAULT_DENOISING_STRENGTH: f32 = 0.5;

/// A single generation request.
///
/// `init_image`, `denoising_strength` and `resize_mode` only reach the wire
/// when `mode` is [`Mode::Img2Img`] and an init image is present.
///
/// # Example
/// ```
/// use axera_rs::{GenerationRequest, Mode, Seed};
///
/// let req = GenerationRequest::txt2img("a red fox in the snow").seed(42);
/// assert_eq!(req.mode, Mode::Txt2Img);
/// assert_eq!(req.seed, Seed::Fixed(42));
///
/// let payload = serde_json::to_value(req.payload()).unwrap();
/// assert!(payload.get("init_image").is_none());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub mode: Mode,
    pub prompt: String,
    pub seed: Seed,
    pub init_image: Option<ImageData>,
    pub denoising_strength: f32,
    pub resize_mode: ResizeMode,
}

impl GenerationRequest {
    /// A text-to-image request with a random seed.
    pub fn txt2img(prompt: impl Into<String>) -> Self {
        Self {
            mode: Mode::Txt2Img,
            prompt: prompt.into(),
            seed: Seed::Random,
            init_image: None,
            denoising_strength: DEFAULT_DENOISING_STRENGTH,
            resize_mode: ResizeMode::Stretch,
        }
    }

    /// An image-to-image request starting from `init_image`.
    pub fn img2img(prompt: impl Into<String>, init_image: ImageData) -> Self {
        Self {
            mode: Mode::Img2Img,
            init_image: Some(init_image),
            ..Self::txt2img(prompt)
        }
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Set a specific seed. Use -1 (the default) for random.
    pub fn seed(mut self, seed: i64) -> Self {
        self.seed = Seed::from_wire(seed);
        self
    }

    pub fn with_seed(mut self, seed: Seed) -> Self {
        self.seed = seed;
        self
    }

    pub fn init_image(mut self, image: Option<ImageData>) -> Self {
        self.init_image = image;
        self
    }

    /// Set the denoising strength, clamped into `[0, 1]`.
    pub fn denoising_strength(mut self, strength: f32) -> Self {
        self.denoising_strength = if strength.is_nan() {
            DEFAULT_DENOISING_STRENGTH
        } else {
            strength.clamp(0.0, 1.0)
        };
        self
    }

    pub fn resize_mode(mut self, mode: ResizeMode) -> Self {
        self.resize_mode = mode;
        self
    }

    /// The JSON body sent to `/generate`.
    pub fn payload(&self) -> GeneratePayload<'_> {
        let img2img = match (&self.mode, &self.init_image) {
            (Mode::Img2Img, Some(img)) => Some(img),
            _ => None,
        };
        GeneratePayload {
            mode: self.mode,
            prompt: &self.prompt,
            seed: self.seed,
            init_image: img2img.map(ImageData::to_base64),
            denoising_strength: img2img.map(|_| self.denoising_strength),
            resize_mode: img2img.map(|_| self.resize_mode),
        }
    }
}

/// Wire body of `POST /generate`.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratePayload<'a> {
    pub mode: Mode,
    pub prompt: &'a str,
    pub seed: Seed,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub init_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub denoising_strength: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resize_mode: Option<ResizeMode>,
}

/// Wire body of a `/generate` response. Every field is optional; the
/// client decides what a usable answer is.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateResponse {
    pub status: Option<String>,
    pub base64: Option<String>,
    pub seed: Option<i64>,
    pub total_time_ms: Option<f64>,
    pub text_time_ms: Option<f64>,
    /// Usually a string, but some servers send an object here.
    pub error: Option<serde_json::Value>,
}

impl GenerateResponse {
    /// The server's error as display text. Strings are used as-is, any
    /// other JSON value is rendered compactly.
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|err| match err {
            serde_json::Value::String(text) => text.clone(),
            other => other.to_string(),
        })
    }
}

/// A decoded successful generation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSuccess {
    pub image: ImageData,
    /// Seed the server actually used (assigned by it when the request was random).
    pub seed: Option<i64>,
    pub total_time_ms: Option<f64>,
    pub text_time_ms: Option<f64>,
}

/// Outcome of one `/generate` call. Transport and server failures both land
/// in [`GenerationResult::Failure`].
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationResult {
    Success(GenerationSuccess),
    Failure { message: String },
}

impl GenerationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, GenerationResult::Success(_))
    }

    pub fn image(&self) -> Option<&ImageData> {
        match self {
            GenerationResult::Success(s) => Some(&s.image),
            GenerationResult::Failure { .. } => None,
        }
    }

    /// Failure text, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            GenerationResult::Success(_) => None,
            GenerationResult::Failure { message } => Some(message),
        }
    }
}

impl From<crate::error::Result<GenerationSuccess>> for GenerationResult {
    fn from(result: crate::error::Result<GenerationSuccess>) -> Self {
        match result {
            Ok(success) => GenerationResult::Success(success),
            Err(e) => GenerationResult::Failure {
                message: e.to_string(),
            },
        }
    }
}

/// An interrogation: standard when `categories` is `None`, structured otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct InterrogationRequest {
    pub image: ImageData,
    pub categories: Option<Categories>,
}

impl InterrogationRequest {
    pub fn standard(image: ImageData) -> Self {
        Self {
            image,
            categories: None,
        }
    }

    pub fn structured(image: ImageData, categories: Categories) -> Self {
        Self {
            image,
            categories: Some(categories),
        }
    }

    pub fn is_structured(&self) -> bool {
        self.categories.is_some()
    }
}

/// Wire body of `POST /interrogate/structured`. Categories serialize in
/// their insertion order.
#[derive(Debug, Clone, Serialize)]
pub struct StructuredInterrogatePayload<'a> {
    pub image: String,
    pub categories: &'a Categories,
}
