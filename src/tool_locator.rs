//! Locating named tools in guide images with a vision model.

use crate::config::VisionConfig;
use crate::error::{BoundingBoxError, ImportError};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::{debug, error, info, warn};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::error::Error;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// `[ymin, xmin, ymax, xmax]` in a 0-1000 normalized coordinate system,
/// origin top-left. Only valid boxes can be constructed or deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<i64>", into = "[u16; 4]")]
pub struct BoundingBox {
    ymin: u16,
    xmin: u16,
    ymax: u16,
    xmax: u16,
}

impl BoundingBox {
    pub fn new(ymin: i64, xmin: i64, ymax: i64, xmax: i64) -> Result<Self, BoundingBoxError> {
        Self::try_from(vec![ymin, xmin, ymax, xmax])
    }

    pub fn ymin(&self) -> u16 {
        self.ymin
    }

    pub fn xmin(&self) -> u16 {
        self.xmin
    }

    pub fn ymax(&self) -> u16 {
        self.ymax
    }

    pub fn xmax(&self) -> u16 {
        self.xmax
    }
}

impl TryFrom<Vec<i64>> for BoundingBox {
    type Error = BoundingBoxError;

    fn try_from(coords: Vec<i64>) -> Result<Self, Self::Error> {
        let [ymin, xmin, ymax, xmax] = coords[..] else {
            return Err(BoundingBoxError::Arity(coords.len()));
        };
        let to_coord = |v: i64| {
            u16::try_from(v)
                .ok()
                .filter(|c| *c <= 1000)
                .ok_or(BoundingBoxError::OutOfRange(v))
        };
        let bbox = Self {
            ymin: to_coord(ymin)?,
            xmin: to_coord(xmin)?,
            ymax: to_coord(ymax)?,
            xmax: to_coord(xmax)?,
        };
        if ymin >= ymax {
            return Err(BoundingBoxError::Vertical { ymin, ymax });
        }
        if xmin >= xmax {
            return Err(BoundingBoxError::Horizontal { xmin, xmax });
        }
        Ok(bbox)
    }
}

impl From<BoundingBox> for [u16; 4] {
    fn from(bbox: BoundingBox) -> Self {
        [bbox.ymin, bbox.xmin, bbox.ymax, bbox.xmax]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolLocation {
    pub tool_name: String,
    pub bbox_2d: BoundingBox,
}

/// Shape of the model's JSON answer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionResult {
    #[serde(default)]
    pub tools: Vec<ToolLocation>,
}

/// Parse and validate a detection answer. One invalid box invalidates the
/// whole answer.
pub fn parse_detections(text: &str) -> Result<Vec<ToolLocation>, serde_json::Error> {
    let result: DetectionResult = serde_json::from_str(text)?;
    Ok(result.tools)
}

#[async_trait]
pub trait ToolLocator: Send + Sync {
    /// Boxes for every visible tool named in `labels`. Empty on any failure.
    async fn locate_tools(&self, image_url: &str, labels: &[String]) -> Vec<ToolLocation>;
}

pub struct GeminiToolLocator {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiToolLocator {
    /// Create a new Gemini tool locator from configuration
    pub fn new(config: &VisionConfig) -> Result<Self, ImportError> {
        // Try config first, then fall back to environment variable
        let api_key = match &config.api_key {
            Some(key) => key.clone(),
            None => std::env::var("GOOGLE_API_KEY")?,
        };
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }

    async fn download_image(&self, image_url: &str) -> Result<(Vec<u8>, String), reqwest::Error> {
        info!("Downloading image from: {}", image_url);
        let response = self.client.get(image_url).send().await?.error_for_status()?;
        let mime = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .filter(|v| v.starts_with("image/"))
            .unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string());
        let bytes = response.bytes().await?;
        Ok((bytes.to_vec(), mime))
    }

    async fn detect(
        &self,
        image: &[u8],
        mime: &str,
        labels: &[String],
    ) -> Result<Vec<ToolLocation>, Box<dyn Error + Send + Sync>> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&json!({
                "contents": [{
                    "parts": [
                        { "text": detection_prompt(labels) },
                        { "inline_data": { "mime_type": mime, "data": STANDARD.encode(image) } }
                    ]
                }],
                "generationConfig": {
                    "response_mime_type": "application/json",
                    "response_schema": detection_schema()
                }
            }))
            .send()
            .await?;

        let response_body: Value = response.json().await?;
        debug!("Gemini response: {:?}", response_body);

        if let Some(error) = response_body.get("error") {
            let error_code = error["code"].as_i64().unwrap_or(0);
            let error_message = error["message"].as_str().unwrap_or("Unknown error");
            return Err(format!("Gemini API error ({}): {}", error_code, error_message).into());
        }

        let text = response_body["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or("Gemini response has no text part")?;
        Ok(parse_detections(text)?)
    }
}

#[async_trait]
impl ToolLocator for GeminiToolLocator {
    async fn locate_tools(&self, image_url: &str, labels: &[String]) -> Vec<ToolLocation> {
        if labels.is_empty() {
            warn!("Empty tool list provided, returning no detections");
            return Vec::new();
        }

        let (image, mime) = match self.download_image(image_url).await {
            Ok(downloaded) => downloaded,
            Err(e) => {
                error!("Error downloading image from {}: {}", image_url, e);
                return Vec::new();
            }
        };

        match self.detect(&image, &mime, labels).await {
            Ok(tools) => {
                info!("Detected {} tool(s) in {}", tools.len(), image_url);
                tools
            }
            Err(e) => {
                error!("Tool detection failed for {}: {}", image_url, e);
                Vec::new()
            }
        }
    }
}

fn detection_prompt(labels: &[String]) -> String {
    let tools = labels.join(", ");
    format!(
        "Analyze this image and locate the following tools: {tools}\n\n\
         For each tool that is clearly visible, return its exact name from the list \
         and a bounding box [ymin, xmin, ymax, xmax] in normalized 0-1000 coordinates, \
         where 0,0 is the top-left corner, ymin < ymax and xmin < xmax.\n\
         Only report tools you can actually see. Return every instance of a tool. \
         Return an empty list if none of the tools are visible."
    )
}

fn detection_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "tools": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "tool_name": { "type": "STRING" },
                        "bbox_2d": { "type": "ARRAY", "items": { "type": "INTEGER" } }
                    },
                    "required": ["tool_name", "bbox_2d"]
                }
            }
        },
        "required": ["tools"]
    })
}
