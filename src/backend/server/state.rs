/**
 * Application State Management
 *
 * This module defines the application state structure and implements
 * the necessary `FromRef` traits for Axum state extraction.
 *
 * # Architecture
 *
 * `AppState` holds the constructed-once collaborators that handlers need:
 * - the validated `Config`
 * - the `StorageHandle` published by the storage supervisor
 * - the `RealtimeSlot` the real-time transport is attached through
 * - the optional upload provider
 *
 * Each of them has exactly one owner that writes it (the supervisor for
 * storage, the orchestrator for the real-time slot); handlers only read.
 *
 * # State Extraction
 *
 * The `FromRef` implementations allow handlers to extract only the part
 * of the state they use:
 *
 * ```rust
 * use axum::extract::State;
 * use chatty::backend::realtime::RealtimeSlot;
 *
 * async fn handler(State(realtime): State<RealtimeSlot>) -> String {
 *     realtime.is_attached().to_string()
 * }
 * ```
 */

use std::sync::Arc;
use axum::extract::FromRef;
use sqlx::PgPool;
use crate::backend::realtime::RealtimeSlot;
use crate::backend::server::config::Config;
use crate::backend::storage::StorageHandle;
use crate::backend::upload::UploadProvider;

/// Application state shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub storage: StorageHandle<PgPool>,
    pub realtime: RealtimeSlot,
    pub uploader: Option<Arc<dyn UploadProvider>>,
}

impl AppState {
    pub fn new(config: Arc<Config>, storage: StorageHandle<PgPool>) -> Self {
        Self {
            config,
            storage,
            realtime: RealtimeSlot::new(),
            uploader: None,
        }
    }

    pub fn with_uploader(mut self, uploader: Arc<dyn UploadProvider>) -> Self {
        self.uploader = Some(uploader);
        self
    }
}

impl FromRef<AppState> for Arc<Config> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.config)
    }
}

impl FromRef<AppState> for StorageHandle<PgPool> {
    fn from_ref(state: &AppState) -> Self {
        state.storage.clone()
    }
}

impl FromRef<AppState> for RealtimeSlot {
    fn from_ref(state: &AppState) -> Self {
        state.realtime.clone()
    }
}

impl FromRef<AppState> for Option<Arc<dyn UploadProvider>> {
    fn from_ref(state: &AppState) -> Self {
        state.uploader.clone()
    }
}
