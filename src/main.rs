use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::CorsLayer;
use tracing::info;

mod character;
mod db;
mod error;
mod generator;
mod item;
mod quest;

use character::Character;
use db::Database;
use error::ApiError;
use generator::{GeneratedStep, QuestGenerator, TemplateGenerator};
use item::{InventoryEntry, Item};
use quest::{NewQuest, Quest};

// ============================================================================
// App State
// ============================================================================

#[derive(Clone)]
struct AppState {
    db: Arc<Database>,
    generator: Arc<dyn QuestGenerator>,
}

impl AppState {
    async fn new(database_url: &str) -> Self {
        let db = Database::new(database_url)
            .await
            .expect("Failed to initialize database");

        Self {
            db: Arc::new(db),
            generator: Arc::new(TemplateGenerator),
        }
    }
}

// ============================================================================
// HTTP Handlers - Characters
// ============================================================================

#[derive(Deserialize)]
struct CreateCharacterRequest {
    username: String,
}

/// POST /api/characters - Register a new character
async fn create_character(
    State(state): State<AppState>,
    Json(req): Json<CreateCharacterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.trim();
    if username.is_empty() {
        return Err(ApiError::Validation("username must not be empty"));
    }

    let character = state.db.create_character(username).await?;
    Ok((StatusCode::CREATED, Json(character)))
}

/// GET /api/characters/:id - Fetch a character with freshly derived status
async fn get_character(
    State(state): State<AppState>,
    Path(character_id): Path<i64>,
) -> Result<Json<Character>, ApiError> {
    let character = state.db.fetch_character(character_id).await?;
    Ok(Json(character))
}

#[derive(Serialize)]
struct RestResponse {
    success: bool,
    message: String,
    hp_restored: i32,
    sp_restored: i32,
    character: Character,
}

/// POST /api/characters/:id/rest - Refill hp and sp to their ceilings
async fn rest_character(
    State(state): State<AppState>,
    Path(character_id): Path<i64>,
) -> Result<Json<RestResponse>, ApiError> {
    let (character, hp_restored, sp_restored) = state.db.rest(character_id).await?;

    Ok(Json(RestResponse {
        success: true,
        message: "Fully rested. hp and sp are back to full.".to_string(),
        hp_restored,
        sp_restored,
        character,
    }))
}

// ============================================================================
// HTTP Handlers - Quests
// ============================================================================

/// GET /api/characters/:id/quests - Visible quests only (hidden chain steps
/// stay out of the list until unlocked)
async fn list_quests(
    State(state): State<AppState>,
    Path(character_id): Path<i64>,
) -> Result<Json<Vec<Quest>>, ApiError> {
    let quests = state.db.visible_quests(character_id).await?;
    Ok(Json(quests))
}

/// POST /api/characters/:id/quests - Create a quest for a character
async fn create_quest(
    State(state): State<AppState>,
    Path(character_id): Path<i64>,
    Json(req): Json<NewQuest>,
) -> Result<impl IntoResponse, ApiError> {
    let quest = state.db.create_quest(character_id, &req).await?;
    Ok((StatusCode::CREATED, Json(quest)))
}

#[derive(Serialize)]
struct CompleteQuestResponse {
    success: bool,
    message: String,
    gold_earned: i32,
    exp_earned: i32,
    level_up: bool,
    new_level: Option<i32>,
    next_quest_unlocked: bool,
}

/// POST /api/quests/:id/complete - Run the completion protocol
async fn complete_quest(
    State(state): State<AppState>,
    Path(quest_id): Path<i64>,
) -> Result<Json<CompleteQuestResponse>, ApiError> {
    let outcome = state.db.complete_quest(quest_id).await?;

    Ok(Json(CompleteQuestResponse {
        success: true,
        message: format!(
            "Quest complete! Earned {} gold and {} exp.",
            outcome.gold_earned, outcome.exp_earned
        ),
        gold_earned: outcome.gold_earned,
        exp_earned: outcome.exp_earned,
        level_up: outcome.level_up,
        new_level: outcome.new_level,
        next_quest_unlocked: outcome.next_quest_unlocked,
    }))
}

#[derive(Deserialize)]
struct GenerateQuestsRequest {
    goal_text: String,
}

/// POST /api/quests/generate - Break a goal into proposed quest steps
async fn generate_quest_steps(
    State(state): State<AppState>,
    Json(req): Json<GenerateQuestsRequest>,
) -> Json<Vec<GeneratedStep>> {
    Json(state.generator.generate(&req.goal_text))
}

// ============================================================================
// HTTP Handlers - Items & Inventory
// ============================================================================

/// GET /api/items - Item catalog
async fn list_items(State(state): State<AppState>) -> Result<Json<Vec<Item>>, ApiError> {
    let items = state.db.list_items().await?;
    Ok(Json(items))
}

/// POST /api/admin/seed-items - Idempotently load the default catalog
async fn seed_items(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let added = state.db.seed_items().await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "items_added": added
    })))
}

/// GET /api/characters/:id/inventory - Inventory entries with item data
async fn list_inventory(
    State(state): State<AppState>,
    Path(character_id): Path<i64>,
) -> Result<Json<Vec<InventoryEntry>>, ApiError> {
    let inventory = state.db.list_inventory(character_id).await?;
    Ok(Json(inventory))
}

#[derive(Serialize)]
struct BuyItemResponse {
    success: bool,
    message: String,
    gold_remaining: i32,
    quantity: i32,
}

/// POST /api/characters/:id/inventory/:item_id/buy - Purchase one unit
async fn buy_item(
    State(state): State<AppState>,
    Path((character_id, item_id)): Path<(i64, i64)>,
) -> Result<Json<BuyItemResponse>, ApiError> {
    let (item, gold_remaining, quantity) = state.db.buy_item(character_id, item_id).await?;

    Ok(Json(BuyItemResponse {
        success: true,
        message: format!("Bought {} for {} gold.", item.name, item.price),
        gold_remaining,
        quantity,
    }))
}

#[derive(Serialize)]
struct UseItemResponse {
    success: bool,
    message: String,
    hp_change: i32,
    sp_change: i32,
}

/// POST /api/characters/:id/inventory/:item_id/use - Consume one unit
async fn use_item(
    State(state): State<AppState>,
    Path((character_id, item_id)): Path<(i64, i64)>,
) -> Result<Json<UseItemResponse>, ApiError> {
    let (item, hp_change, sp_change) = state.db.use_item(character_id, item_id).await?;

    Ok(Json(UseItemResponse {
        success: true,
        message: format!("Used {}.", item.name),
        hp_change,
        sp_change,
    }))
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().timestamp_millis()
    }))
}

// ============================================================================
// Main
// ============================================================================

fn router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Characters
        .route("/api/characters", post(create_character))
        .route("/api/characters/:id", get(get_character))
        .route("/api/characters/:id/rest", post(rest_character))
        // Quests
        .route(
            "/api/characters/:id/quests",
            get(list_quests).post(create_quest),
        )
        .route("/api/quests/:id/complete", post(complete_quest))
        .route("/api/quests/generate", post(generate_quest_steps))
        // Items & inventory
        .route("/api/items", get(list_items))
        .route("/api/admin/seed-items", post(seed_items))
        .route("/api/characters/:id/inventory", get(list_inventory))
        .route(
            "/api/characters/:id/inventory/:item_id/buy",
            post(buy_item),
        )
        .route(
            "/api/characters/:id/inventory/:item_id/use",
            post(use_item),
        )
        // For production, specify allowed origins explicitly
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
                .allow_headers([axum::http::header::CONTENT_TYPE]),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("lifequest_server=info".parse().unwrap()),
        )
        .init();

    let state = AppState::new("sqlite:lifequest.db?mode=rwc").await;
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], 8000));
    info!("LifeQuest server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
