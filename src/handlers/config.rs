use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;

/// Effective configuration after defaults, `config.toml` and environment
/// overrides have been merged. Read-only: changing staging directories or the
/// engine under running jobs is not supported.
pub async fn get_config(state: web::Data<AppState>) -> HttpResponse {
    let config = &state.config;

    HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "config": {
            "server": config.server,
            "staging": config.staging,
            "engine": config.engine,
            "limits": config.limits,
            "languages": crate::alignment::Language::ALL
                .iter()
                .map(|lang| json!({"code": lang.code(), "phone_table": lang.phone_table()}))
                .collect::<Vec<_>>()
        }
    }))
}
