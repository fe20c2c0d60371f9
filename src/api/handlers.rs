use axum::{Json, extract::State, http::StatusCode};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

use crate::data_models::PostcodeInput;
use crate::finder::{GritBinTool, TOOL_DESCRIPTION, TOOL_NAME};

use super::models::{ErrorResponse, ExecuteRequest, ExecuteResponse, ToolDefinition};

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

pub async fn execute_handler(
    State(tool): State<Arc<dyn GritBinTool>>,
    Json(request): Json<ExecuteRequest>,
) -> Result<Json<ExecuteResponse>, ApiError> {
    if request.tool_name != TOOL_NAME {
        return Err(api_error(
            StatusCode::NOT_FOUND,
            format!("Tool '{}' not found.", request.tool_name),
        ));
    }

    let Some(postcode) = request.postcode() else {
        return Err(api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Missing required parameter: 'postcode'",
        ));
    };

    let start = Instant::now();
    let result = tool
        .view_gritbins_on_map(PostcodeInput { postcode })
        .await
        .map_err(|e| {
            log::error!("error executing {TOOL_NAME}: {e:#}");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        })?;
    log::info!("{TOOL_NAME} finished in {}ms", start.elapsed().as_millis());

    Ok(Json(ExecuteResponse { result }))
}

pub async fn tools_handler() -> Json<Vec<ToolDefinition>> {
    Json(vec![ToolDefinition {
        name: TOOL_NAME,
        description: TOOL_DESCRIPTION,
        input_schema: json!({
            "type": "object",
            "properties": {
                "postcode": {
                    "type": "string",
                    "description": "The UK postcode to search, e.g., 'LS28 5UL'."
                }
            },
            "required": ["postcode"]
        }),
    }])
}
