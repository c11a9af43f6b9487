/// Service banner at `GET /`

use axum::Json;
use serde_json::{json, Value};

pub async fn index() -> Json<Value> {
    Json(json!({
        "message": "Task Board API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": {
            "register": "/api/auth/register/",
            "token": "/api/auth/token/",
            "token_refresh": "/api/auth/token/refresh/",
            "logout": "/api/auth/logout/",
            "csrf": "/api/auth/csrf/",
            "me": "/api/auth/me/",
            "tasks": "/api/tasks/",
            "health": "/health"
        }
    }))
}
