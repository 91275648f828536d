use anyhow::Context;
use axum::{
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use log::{error, info};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::applescript::NOTES_FOLDER;
use crate::notes::{notes_service, Note, NoteSummary};

// JSON-RPC request/response types
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    id: Option<Value>,
    method: String,
    params: Option<Value>,
}

#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: String,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i64,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl JsonRpcResponse {
    fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Value, code: i64, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
                data: None,
            }),
        }
    }
}

// MCP protocol constants
const MCP_PROTOCOL_VERSION: &str = "2025-03-26";
const SERVER_NAME: &str = "inotes";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

// The list tool never reports more than this many notes.
const NOTES_LIST_LIMIT: usize = 50;

// Tool definitions
fn get_tools() -> Value {
    json!([
        {
            "name": "create_note",
            "description": "Create a new note in the Claude Diary folder. Returns the new note's ID.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "title": {
                        "type": "string",
                        "description": "The title of the note"
                    },
                    "body": {
                        "type": "string",
                        "description": "The content/body of the note"
                    }
                },
                "required": ["title", "body"]
            }
        },
        {
            "name": "append_to_note",
            "description": "Append content to an existing note. This is append-only: existing content is never replaced or deleted.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "note_id": {
                        "type": "string",
                        "description": "The ID of the note to append to (x-coredata:// URL)"
                    },
                    "content": {
                        "type": "string",
                        "description": "The content to append"
                    }
                },
                "required": ["note_id", "content"]
            }
        },
        {
            "name": "get_note",
            "description": "Get the full content of a note by its ID, including body and timestamps.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "note_id": {
                        "type": "string",
                        "description": "The note ID (x-coredata:// URL)"
                    }
                },
                "required": ["note_id"]
            }
        },
        {
            "name": "get_notes_list",
            "description": "List notes in the Claude Diary folder with their IDs and timestamps. Date filtering is not yet implemented; all notes are returned.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "start_date": {
                        "type": "string",
                        "description": "Start date in ISO format (YYYY-MM-DD) - not yet implemented"
                    },
                    "end_date": {
                        "type": "string",
                        "description": "End date in ISO format (YYYY-MM-DD) - not yet implemented"
                    }
                },
                "required": []
            }
        }
    ])
}

/// Build the router serving the MCP endpoint and the health check.
pub fn router() -> Router {
    Router::new()
        .route("/mcp", post(handle_mcp))
        .route("/health", get(handle_health))
        .layer(CorsLayer::permissive())
}

/// Serve MCP over HTTP on localhost until the process is stopped.
pub async fn serve(port: u16) -> anyhow::Result<()> {
    let addr = format!("127.0.0.1:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("MCP server listening on http://{}", addr);

    axum::serve(listener, router()).await?;
    Ok(())
}

// Health check endpoint
async fn handle_health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "server": SERVER_NAME,
        "version": SERVER_VERSION,
        "folder": NOTES_FOLDER,
    }))
}

// Main MCP JSON-RPC handler
async fn handle_mcp(Json(request): Json<JsonRpcRequest>) -> (StatusCode, Json<JsonRpcResponse>) {
    let id = request.id.unwrap_or(Value::Null);

    if request.jsonrpc != "2.0" {
        return (
            StatusCode::OK,
            Json(JsonRpcResponse::error(
                id,
                -32600,
                "Invalid JSON-RPC version".to_string(),
            )),
        );
    }

    let response = match request.method.as_str() {
        "initialize" => handle_initialize(id),
        "notifications/initialized" => {
            // Client acknowledgement, no response needed but we return success
            JsonRpcResponse::success(id, json!({}))
        }
        "tools/list" => handle_tools_list(id),
        "tools/call" => handle_tools_call(id, request.params).await,
        "resources/list" => JsonRpcResponse::success(id, json!({ "resources": [] })),
        "resources/read" => JsonRpcResponse::error(id, -32602, "Resource not found".to_string()),
        "prompts/list" => JsonRpcResponse::success(id, json!({ "prompts": [] })),
        "ping" => JsonRpcResponse::success(id, json!({})),
        _ => JsonRpcResponse::error(id, -32601, format!("Method not found: {}", request.method)),
    };

    (StatusCode::OK, Json(response))
}

// MCP initialize
fn handle_initialize(id: Value) -> JsonRpcResponse {
    JsonRpcResponse::success(
        id,
        json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {
                "tools": { "listChanged": false },
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": SERVER_VERSION,
            }
        }),
    )
}

// MCP tools/list
fn handle_tools_list(id: Value) -> JsonRpcResponse {
    JsonRpcResponse::success(id, json!({ "tools": get_tools() }))
}

// MCP tools/call dispatcher
async fn handle_tools_call(id: Value, params: Option<Value>) -> JsonRpcResponse {
    let params = match params {
        Some(p) => p,
        None => {
            return JsonRpcResponse::error(id, -32602, "Missing params".to_string());
        }
    };

    let tool_name = params.get("name").and_then(|v| v.as_str()).unwrap_or("");

    let arguments = params
        .get("arguments")
        .cloned()
        .unwrap_or_else(|| json!({}));

    let result = match tool_name {
        "create_note" => tool_create_note(&arguments).await,
        "append_to_note" => tool_append_to_note(&arguments).await,
        "get_note" => tool_get_note(&arguments).await,
        "get_notes_list" => tool_get_notes_list(&arguments).await,
        _ => Err(format!("Unknown tool: {}", tool_name)),
    };

    match result {
        Ok(content) => JsonRpcResponse::success(
            id,
            json!({
                "content": [{
                    "type": "text",
                    "text": content
                }]
            }),
        ),
        Err(e) => JsonRpcResponse::success(
            id,
            json!({
                "content": [{
                    "type": "text",
                    "text": format!("Error: {}", e)
                }],
                "isError": true
            }),
        ),
    }
}

// Tool implementations

async fn tool_create_note(args: &Value) -> Result<String, String> {
    let title = args
        .get("title")
        .and_then(|v| v.as_str())
        .ok_or("Missing required parameter: title")?;

    let body = args
        .get("body")
        .and_then(|v| v.as_str())
        .ok_or("Missing required parameter: body")?;

    let note_id = notes_service()
        .create_note(title, body)
        .await
        .map_err(|e| {
            error!("{}", e);
            e.to_string()
        })?;

    Ok(format_created(title, &note_id))
}

async fn tool_append_to_note(args: &Value) -> Result<String, String> {
    let note_id = args
        .get("note_id")
        .and_then(|v| v.as_str())
        .ok_or("Missing required parameter: note_id")?;

    let content = args
        .get("content")
        .and_then(|v| v.as_str())
        .ok_or("Missing required parameter: content")?;

    notes_service()
        .append_to_note(note_id, content)
        .await
        .map_err(|e| {
            error!("{}", e);
            e.to_string()
        })?;

    Ok(format_appended(note_id))
}

async fn tool_get_note(args: &Value) -> Result<String, String> {
    let note_id = args
        .get("note_id")
        .and_then(|v| v.as_str())
        .ok_or("Missing required parameter: note_id")?;

    let note = notes_service().get_note(note_id).await.map_err(|e| {
        error!("{}", e);
        e.to_string()
    })?;

    Ok(format_note(&note))
}

async fn tool_get_notes_list(args: &Value) -> Result<String, String> {
    let start_date = args.get("start_date").and_then(|v| v.as_str());
    let end_date = args.get("end_date").and_then(|v| v.as_str());

    let notes = notes_service()
        .get_notes_list(start_date, end_date)
        .await
        .map_err(|e| {
            error!("{}", e);
            e.to_string()
        })?;

    Ok(format_notes_list(&notes))
}

// Tool result formatting

fn format_created(title: &str, note_id: &str) -> String {
    format!(
        "Created note: \"{}\"\nID: {}\nFolder: {} (hardcoded)",
        title, note_id, NOTES_FOLDER
    )
}

fn format_appended(note_id: &str) -> String {
    format!("Successfully appended content to note\nID: {}", note_id)
}

fn format_note(note: &Note) -> String {
    let output = [
        format!("Note: \"{}\"", note.name),
        format!("ID: {}", note.id),
        format!("Created: {}", note.creation_date),
        format!("Modified: {}", note.modification_date),
        String::new(),
        "Content:".to_string(),
        "---".to_string(),
        note.body.clone(),
    ];

    output.join("\n")
}

fn format_notes_list(notes: &[NoteSummary]) -> String {
    if notes.is_empty() {
        return format!("No notes found in {} folder", NOTES_FOLDER);
    }

    let notes = &notes[..notes.len().min(NOTES_LIST_LIMIT)];

    let mut output = vec![format!(
        "Found {} note(s) in {}:\n",
        notes.len(),
        NOTES_FOLDER
    )];

    for (i, note) in notes.iter().enumerate() {
        output.push(format!("{}. \"{}\"", i + 1, note.name));
        output.push(format!("   ID: {}", note.id));
        output.push(format!("   Created: {}", note.creation_date));
        output.push(format!("   Modified: {}", note.modification_date));
        output.push(String::new());
    }

    output.join("\n")
}
