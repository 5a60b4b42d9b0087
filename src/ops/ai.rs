// ============================================================================
// AI COLLABORATOR — Gemini-backed difference analysis and prompt edits
// ============================================================================
//
// Opaque remote capability: two images (or one, for edits) plus a text
// instruction go out, text or a generated image comes back. Nothing here
// inspects pixel content; every failure — missing key, network, empty
// response — surfaces as a plain error string for the AI panel.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::io::encode_png_bytes;

const ANALYZE_MODEL: &str = "gemini-2.5-flash";
const EDIT_MODEL: &str = "gemini-2.5-flash-image";
const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

/// Fixed instruction used when the user asks for a plain comparison.
pub const ANALYZE_TEMPLATE: &str = "Act as an expert in visual analysis and graphic design. \
Compare these two images (Image A and Image B). Describe in detail:\n\
1. The main visual differences (color, lighting, composition).\n\
2. If this looks like a before/after edit, what changes were applied.\n\
3. Any notable technical details.\n\
Be concise and format the answer as bullet points.";

// --- Wire types (Gemini generateContent REST shape) -------------------------

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Serialize, Deserialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
    #[serde(rename = "inlineData")]
    inline_data: Option<InlineData>,
}

// --- Part builders ----------------------------------------------------------

fn text_part(text: impl Into<String>) -> Part {
    Part { text: Some(text.into()), inline_data: None }
}

fn image_part(img: &RgbaImage) -> Result<Part, String> {
    let png = encode_png_bytes(img).map_err(|e| e.to_string())?;
    Ok(Part {
        text: None,
        inline_data: Some(InlineData {
            mime_type: "image/png".to_string(),
            data: BASE64.encode(png),
        }),
    })
}

// --- Entry points (blocking; the app runs these on a worker thread) ---------

/// Ask the model to describe the differences between the two images.
pub fn analyze_difference(
    api_key: &str,
    image_a: &RgbaImage,
    image_b: &RgbaImage,
    instruction: Option<&str>,
) -> Result<String, String> {
    let request = GenerateRequest {
        contents: vec![Content {
            parts: vec![
                text_part("This is Image A:"),
                image_part(image_a)?,
                text_part("This is Image B:"),
                image_part(image_b)?,
                text_part(instruction.unwrap_or(ANALYZE_TEMPLATE)),
            ],
        }],
    };

    let response = send(api_key, ANALYZE_MODEL, &request)?;
    first_text(&response).ok_or_else(|| "The model returned no analysis text.".to_string())
}

/// Ask the image model to edit `image` according to `instruction`, returning
/// the generated raster.
pub fn edit_image(
    api_key: &str,
    image: &RgbaImage,
    instruction: &str,
) -> Result<RgbaImage, String> {
    let request = GenerateRequest {
        contents: vec![Content {
            parts: vec![
                image_part(image)?,
                text_part(format!(
                    "Edit this image strictly following this instruction: {}. \
                     Keep the original structure of the image as much as possible.",
                    instruction
                )),
            ],
        }],
    };

    let response = send(api_key, EDIT_MODEL, &request)?;

    // The image, when present, arrives as an inline-data part.
    for candidate in &response.candidates {
        let Some(content) = &candidate.content else { continue };
        for part in &content.parts {
            if let Some(inline) = &part.inline_data {
                let bytes = BASE64
                    .decode(inline.data.as_bytes())
                    .map_err(|e| format!("Response image was not valid base64: {}", e))?;
                return image::load_from_memory(&bytes)
                    .map(|d| d.to_rgba8())
                    .map_err(|e| format!("Response image could not be decoded: {}", e));
            }
        }
    }
    Err("No image was generated.".to_string())
}

fn send(
    api_key: &str,
    model: &str,
    request: &GenerateRequest,
) -> Result<GenerateResponse, String> {
    if api_key.trim().is_empty() {
        return Err("API key not configured (Settings → AI).".to_string());
    }

    let client = reqwest::blocking::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| format!("HTTP client init failed: {}", e))?;

    let url = format!("{}/{}:generateContent", API_BASE, model);
    let response = client
        .post(&url)
        .query(&[("key", api_key)])
        .json(request)
        .send()
        .map_err(|e| format!("Request failed: {}", e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        // Gemini wraps errors as {"error": {"message": ...}}; fall back to the
        // raw body when the shape is anything else.
        let detail = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
            .unwrap_or_else(|| truncate(&body, 300).to_string());
        return Err(format!("API error {}: {}", status, detail));
    }

    response
        .json::<GenerateResponse>()
        .map_err(|e| format!("Malformed API response: {}", e))
}

fn first_text(response: &GenerateResponse) -> Option<String> {
    for candidate in &response.candidates {
        let Some(content) = &candidate.content else { continue };
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join("");
        if !text.is_empty() {
            return Some(text);
        }
    }
    None
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
