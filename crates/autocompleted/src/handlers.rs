//! Request handlers for the HTTP API

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::error::ApiError;
use crate::server::AppState;

/// Login request body
#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct AddWordsRequest {
    pub words: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteWordRequest {
    /// Empty or absent clears every word
    #[serde(default)]
    pub word: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub prefix: Option<String>,
    pub contains: Option<String>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ExistsParams {
    pub word: Option<String>,
}

fn check_len(state: &AppState, word: &str) -> Result<(), ApiError> {
    if word.chars().count() > state.max_word_len {
        return Err(ApiError::BadRequest(format!(
            "Word exceeds {} characters",
            state.max_word_len
        )));
    }
    Ok(())
}

/// `POST /api/login`: exchange credentials for a bearer token
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(creds) = payload?;

    // bcrypt verification blocks
    let verifier = Arc::clone(&state);
    let user = tokio::task::spawn_blocking(move || {
        verifier.users.authenticate(&creds.username, &creds.password)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?
    .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    let token = state
        .tokens
        .issue(&user.username)
        .map_err(|e| ApiError::Internal(format!("Error generating token: {}", e)))?;

    info!("Issued token for {}", user.username);
    Ok(Json(json!({ "token": token })))
}

/// `GET /api/v1`: endpoint overview
pub async fn root() -> Json<Value> {
    Json(json!({
        "status": "success",
        "message": "Welcome to the Trie-based Autocomplete API",
        "endpoints": [
            {"method": "POST", "endpoint": "/api/login", "description": "Authenticate, generate token"},
            {"method": "POST", "endpoint": "/api/v1/words", "description": "Add words to the Trie"},
            {"method": "GET", "endpoint": "/api/v1/words", "description": "Lookup words that start with a given prefix or retrieve all words"},
            {"method": "DELETE", "endpoint": "/api/v1/words", "description": "Delete a word from the Trie or clear all words"},
            {"method": "GET", "endpoint": "/api/v1/words/exists", "description": "Check if a word exists in the Trie"},
            {"method": "GET", "endpoint": "/api/v1/stats", "description": "Index and cache statistics"},
        ],
    }))
}

/// `POST /api/v1/words`
pub async fn add_words(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AddWordsRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload?;
    for word in &request.words {
        check_len(&state, word)?;
    }

    let added = state.store.insert_words(&request.words);
    info!("Added {} of {} words", added, request.words.len());

    Ok(Json(json!({
        "status": "success",
        "message": "Words added successfully.",
        "added": added,
    })))
}

/// `GET /api/v1/words`: prefix lookup, everything when no prefix is given
pub async fn list_words(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = params?;

    let prefix = params.prefix.unwrap_or_default();
    check_len(&state, &prefix)?;

    let query = triecache::Query {
        prefix,
        contains: params.contains,
        offset: params.offset.unwrap_or(0),
        limit: params.limit,
    };
    let page = state.store.search(&query);

    Ok(Json(json!({
        "status": "success",
        "count": page.count(),
        "total": page.total,
        "data": page.words,
    })))
}

/// `DELETE /api/v1/words`: one word, or every word when none is given
pub async fn delete_words(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DeleteWordRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload?;
    check_len(&state, &request.word)?;

    let deleted = if request.word.is_empty() {
        info!("Clearing all words");
        state.store.clear()
    } else {
        state.store.delete_word(&request.word)
    };

    Ok(Json(json!({
        "status": "success",
        "message": "Word(s) deleted successfully.",
        "deleted": deleted,
    })))
}

/// `GET /api/v1/words/exists`
pub async fn word_exists(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ExistsParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = params?;

    let word = params
        .word
        .filter(|word| !word.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing 'word' query parameter".to_string()))?;
    check_len(&state, &word)?;

    Ok(Json(json!({
        "status": "success",
        "exists": state.store.exists(&word),
    })))
}

/// `GET /api/v1/stats`
pub async fn stats(State(state): State<Arc<AppState>>) -> Json<Value> {
    let store = &state.store;
    let stats = store.stats().snapshot();

    Json(json!({
        "status": "success",
        "words": store.word_count(),
        "nodes": store.node_count(),
        "cache": {
            "entries": store.cache_len(),
            "ttl_secs": store.config().ttl.as_secs(),
            "hits": stats.hits,
            "misses": stats.misses,
            "inserts": stats.inserts,
            "invalidations": stats.invalidations,
            "expirations": stats.expirations,
            "hit_ratio": stats.hit_ratio,
        },
        "rate_limited_clients": state.limiter.len(),
    }))
}
