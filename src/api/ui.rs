//! Server-rendered status page

use askama::Template;
use axum::{extract::State, response::Html};
use std::sync::Arc;

use crate::backend::Instance;
use crate::error::{AppError, Result};
use crate::AppState;

/// One line of the instance list
struct InstanceRow {
    index: usize,
    host: String,
    port: u16,
    available: bool,
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    rows: Vec<InstanceRow>,
}

impl IndexTemplate {
    fn new(instances: &[Instance]) -> Self {
        let rows = instances
            .iter()
            .enumerate()
            .map(|(index, instance)| InstanceRow {
                index,
                host: instance.address.host().to_string(),
                port: instance.address.port(),
                available: instance.healthy,
            })
            .collect();
        Self { rows }
    }
}

pub async fn index_page(State(state): State<Arc<AppState>>) -> Result<Html<String>> {
    render_index(&state.admin.status()).map(Html)
}

/// Instance list with remove buttons, the add form, and shortcuts
pub fn render_index(instances: &[Instance]) -> Result<String> {
    IndexTemplate::new(instances)
        .render()
        .map_err(|e| AppError::Internal(format!("Failed to render index page: {}", e)))
}
