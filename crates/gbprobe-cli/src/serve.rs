//! Line-delimited JSON front end: one request object per input line, one
//! response object per output line.

use crate::dispatch::{dispatch, ToolOutput};
use crate::tools::{ToolCall, TOOLS};
use gbprobe_session::{Launcher, Orchestrator};
use serde::Deserialize;
use serde_json::{json, Value};
use std::io::{self, BufRead, Write};

pub const LIST_TOOLS: &str = "list-tools";

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: Value,
    tool: String,
    #[serde(default)]
    arguments: Value,
}

/// Serves requests until `input` is exhausted. Returns the number of
/// requests answered. Blank lines are skipped.
pub fn serve<L, R, W>(orchestrator: &Orchestrator<L>, input: R, mut output: W) -> io::Result<usize>
where
    L: Launcher,
    R: BufRead,
    W: Write,
{
    let mut answered = 0;
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let response = respond(orchestrator, &line);
        serde_json::to_writer(&mut output, &response)?;
        output.write_all(b"\n")?;
        output.flush()?;
        answered += 1;
    }
    tracing::info!(answered, "input closed");
    Ok(answered)
}

fn respond<L: Launcher>(orchestrator: &Orchestrator<L>, line: &str) -> Value {
    let request: Request = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(err) => {
            tracing::warn!(error = %err, "rejecting request");
            return response(
                Value::Null,
                &ToolOutput::error(format!("Invalid request: {err}")),
            );
        }
    };

    if request.tool == LIST_TOOLS {
        let tools: Vec<Value> = TOOLS
            .iter()
            .map(|info| json!({ "name": info.name, "description": info.description }))
            .collect();
        return json!({ "id": request.id, "tools": tools });
    }

    let output = match ToolCall::from_parts(&request.tool, request.arguments) {
        Ok(call) => dispatch(orchestrator, call),
        Err(err) => ToolOutput::error(format!("Error: {err}")),
    };
    response(request.id, &output)
}

fn response(id: Value, output: &ToolOutput) -> Value {
    let content: Vec<Value> = output.content.iter().map(|item| item.to_wire()).collect();
    json!({ "id": id, "content": content, "is_error": output.is_error })
}
