//! Prompt extraction from image metadata
//!
//! Generated PNGs carry the workflow that produced them in a `prompt` text
//! chunk: a JSON object mapping node id to `{class_type, inputs}`. The
//! positive prompt is found heuristically:
//!
//! 1. any node with an `inputs.clip_l`
//! 2. any node with `inputs.text_g` (or else `inputs.text_l`)
//! 3. the node referenced by the first `inputs.positive` link, if it has `inputs.text`
//! 4. any `CLIPTextEncode` node with `inputs.text`
//!
//! Nothing here fails: a missing chunk or unreadable payload yields an empty
//! prompt.

use serde_json::{Map, Value};
use std::io::Cursor;
use tracing::{debug, warn};

/// Text chunk keyword holding the workflow
pub const PROMPT_CHUNK_KEY: &str = "prompt";

/// Node type of the canonical text encoder
pub const TEXT_ENCODE_NODE: &str = "CLIPTextEncode";

/// Extract the positive prompt from image bytes
pub fn extract(container: &[u8]) -> String {
    match read_prompt_chunk(container) {
        Some(chunk) => extract_from_workflow(&chunk),
        None => {
            debug!("No prompt chunk found in image metadata");
            String::new()
        }
    }
}

/// Read the raw `prompt` text chunk from a PNG
pub fn read_prompt_chunk(container: &[u8]) -> Option<String> {
    let decoder = png::Decoder::new(Cursor::new(container));
    let reader = match decoder.read_info() {
        Ok(reader) => reader,
        Err(e) => {
            debug!("Not a readable PNG: {}", e);
            return None;
        }
    };
    let info = reader.info();

    if let Some(chunk) = info
        .uncompressed_latin1_text
        .iter()
        .find(|chunk| chunk.keyword == PROMPT_CHUNK_KEY)
    {
        return Some(chunk.text.clone());
    }

    if let Some(chunk) = info
        .compressed_latin1_text
        .iter()
        .find(|chunk| chunk.keyword == PROMPT_CHUNK_KEY)
    {
        return chunk.get_text().ok();
    }

    info.utf8_text
        .iter()
        .find(|chunk| chunk.keyword == PROMPT_CHUNK_KEY)
        .and_then(|chunk| chunk.get_text().ok())
}

/// Find the positive prompt in a serialized workflow
pub fn extract_from_workflow(payload: &str) -> String {
    let nodes: Map<String, Value> = match serde_json::from_str(payload) {
        Ok(Value::Object(nodes)) => nodes,
        Ok(_) => {
            warn!("Prompt metadata is not a node map");
            return String::new();
        }
        Err(e) => {
            warn!("Failed to parse prompt metadata: {}", e);
            return String::new();
        }
    };

    find_prompt(&nodes).unwrap_or_default().to_string()
}

fn find_prompt(nodes: &Map<String, Value>) -> Option<&str> {
    let ordered = visit_order(nodes);

    if let Some(text) = ordered.iter().copied().find_map(|node| input_text(node, "clip_l")) {
        return Some(text);
    }

    if let Some(text) = ordered
        .iter()
        .copied()
        .find_map(|node| input_text(node, "text_g").or_else(|| input_text(node, "text_l")))
    {
        return Some(text);
    }

    // Only the first node carrying a positive link is followed
    let positive_ref = ordered
        .iter()
        .copied()
        .find_map(|node| inputs(node)?.get("positive").filter(|v| is_truthy(v)))
        .and_then(|link| link.get(0))
        .and_then(node_id);
    if let Some(text) = positive_ref
        .and_then(|id| nodes.get(&id))
        .and_then(|node| input_text(node, "text"))
    {
        return Some(text);
    }

    ordered.iter().copied().find_map(|node| {
        if node.get("class_type").and_then(Value::as_str) == Some(TEXT_ENCODE_NODE) {
            input_text(node, "text")
        } else {
            None
        }
    })
}

/// Nodes in the order workflow tools enumerate them: integer ids ascending,
/// then any other ids in document order
fn visit_order(nodes: &Map<String, Value>) -> Vec<&Value> {
    let mut numeric: Vec<(u32, &Value)> = Vec::new();
    let mut named: Vec<&Value> = Vec::new();
    for (id, node) in nodes {
        match id.parse::<u32>() {
            Ok(n) if n.to_string() == *id && n != u32::MAX => numeric.push((n, node)),
            _ => named.push(node),
        }
    }
    numeric.sort_by_key(|(n, _)| *n);
    numeric.into_iter().map(|(_, node)| node).chain(named).collect()
}

fn inputs(node: &Value) -> Option<&Map<String, Value>> {
    node.get("inputs")?.as_object()
}

fn input_text<'a>(node: &'a Value, field: &str) -> Option<&'a str> {
    inputs(node)?
        .get(field)?
        .as_str()
        .filter(|text| !text.is_empty())
}

fn node_id(value: &Value) -> Option<String> {
    match value {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64() != Some(0.0),
        _ => true,
    }
}
