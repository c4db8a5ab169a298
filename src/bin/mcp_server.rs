//! Gauntlet MCP Server
//!
//! A Model Context Protocol server using the rmcp SDK that exposes the
//! Gauntlet battle engine for LLM interaction over stdio.

use std::borrow::Cow;
use std::sync::Arc;

use gauntlet::battle::runner::BattleRunner;
use gauntlet::demo::demo_content;
use gauntlet::mcp_interface::*;
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{ErrorData as McpError, *},
    schemars, tool, tool_handler, tool_router, ServerHandler, ServiceExt,
};
use serde::Deserialize;
use tokio::io::{stdin, stdout};
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

const NO_BATTLE: &str = "No battle is currently active. Use 'start_battle' to begin.";

#[derive(Debug, Clone)]
pub struct GauntletService {
    tool_router: ToolRouter<GauntletService>,
    runner: Arc<Mutex<Option<BattleRunner>>>,
}

// Tool request structures
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct StartBattleRequest {
    #[schemars(description = "Encounter id: goblin_camp, wolf_arena or elder_treant")]
    pub encounter: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UseSkillRequest {
    #[schemars(description = "Name of the skill the active hero should use")]
    pub skill_name: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SelectTargetRequest {
    #[schemars(description = "Unit number of the target, as shown in the battle state")]
    pub target: usize,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct LookupSkillRequest {
    #[schemars(description = "Name of the skill to look up")]
    pub skill_name: String,
}

fn text_result(text: String) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

#[tool_router]
impl GauntletService {
    pub fn new() -> Self {
        Self {
            tool_router: Self::tool_router(),
            runner: Arc::new(Mutex::new(None)),
        }
    }

    #[tool(description = "List the available demo encounters")]
    async fn get_available_encounters(&self) -> Result<CallToolResult, McpError> {
        text_result(get_available_encounters_display())
    }

    #[tool(description = "Start a new battle against the chosen encounter")]
    async fn start_battle(
        &self,
        Parameters(request): Parameters<StartBattleRequest>,
    ) -> Result<CallToolResult, McpError> {
        match create_battle(&request.encounter) {
            Ok((runner, intro_text)) => {
                *self.runner.lock().await = Some(runner);
                text_result(intro_text)
            }
            Err(e) => Err(McpError {
                code: ErrorCode(-32603),
                message: Cow::from(format!("Error starting battle: {}", e)),
                data: None,
            }),
        }
    }

    #[tool(description = "Get the current battle state and whose turn it is")]
    async fn get_battle_state(&self) -> Result<CallToolResult, McpError> {
        let text = match self.runner.lock().await.as_ref() {
            Some(runner) => get_battle_status_summary(runner),
            None => NO_BATTLE.to_string(),
        };
        text_result(text)
    }

    #[tool(description = "Use a skill with the hero whose turn it is")]
    async fn use_skill(
        &self,
        Parameters(request): Parameters<UseSkillRequest>,
    ) -> Result<CallToolResult, McpError> {
        let text = match self.runner.lock().await.as_mut() {
            Some(runner) => execute_skill_action(runner, &request.skill_name).unwrap_or_else(|e| format!("Error: {}", e)),
            None => NO_BATTLE.to_string(),
        };
        text_result(text)
    }

    #[tool(description = "Choose the target for the pending skill")]
    async fn select_target(
        &self,
        Parameters(request): Parameters<SelectTargetRequest>,
    ) -> Result<CallToolResult, McpError> {
        let text = match self.runner.lock().await.as_mut() {
            Some(runner) => execute_target_action(runner, request.target).unwrap_or_else(|e| format!("Error: {}", e)),
            None => NO_BATTLE.to_string(),
        };
        text_result(text)
    }

    #[tool(description = "Cancel the pending skill and choose again")]
    async fn cancel_selection(&self) -> Result<CallToolResult, McpError> {
        let text = match self.runner.lock().await.as_mut() {
            Some(runner) => execute_cancel_action(runner).unwrap_or_else(|e| format!("Error: {}", e)),
            None => NO_BATTLE.to_string(),
        };
        text_result(text)
    }

    #[tool(description = "Look up detailed information about a skill")]
    async fn lookup_skill(
        &self,
        Parameters(request): Parameters<LookupSkillRequest>,
    ) -> Result<CallToolResult, McpError> {
        let text = match demo_content() {
            Ok(content) => handle_lookup_skill_command(&content, &request.skill_name),
            Err(e) => format!("Error: {}", e),
        };
        text_result(text)
    }
}

#[tool_handler]
impl ServerHandler for GauntletService {}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stdout carries the protocol; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Gauntlet MCP server starting");
    let service = GauntletService::new();
    let transport = (stdin(), stdout());

    let server = service.serve(transport).await?;
    tracing::info!("server running, waiting for shutdown");
    let quit_reason = server.waiting().await?;

    tracing::info!(?quit_reason, "Gauntlet MCP server exiting");
    Ok(())
}
