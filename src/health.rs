//! Health and metrics endpoints.
//!
//! The service is only useful if the engine can run, so health covers the
//! staging directories and the alignment script as well as the process.

use crate::config::AppConfig;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;
use std::path::Path;

pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let metrics = state.get_metrics_snapshot();
    let config = &state.config;
    let dependencies = check_dependencies(config).await;
    let healthy = dependencies.iter().all(|check| check.available);

    let body = json!({
        "status": if healthy { "healthy" } else { "degraded" },
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": state.get_uptime_seconds(),
        "service": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "host": config.server.host,
            "port": config.server.port
        },
        "metrics": {
            "total_requests": metrics.request_count,
            "total_errors": metrics.error_count,
            "error_rate": metrics.error_rate(),
            "jobs_in_flight": metrics.jobs_in_flight
        },
        "dependencies": dependencies
            .iter()
            .map(|check| json!({
                "name": check.name,
                "path": check.path,
                "available": check.available
            }))
            .collect::<Vec<_>>(),
        "memory": get_memory_info()
    });

    if healthy {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}

pub async fn detailed_metrics(state: web::Data<AppState>) -> HttpResponse {
    let metrics = state.get_metrics_snapshot();
    let uptime_seconds = state.get_uptime_seconds();

    let mut endpoint_stats: Vec<_> = metrics
        .endpoint_metrics
        .iter()
        .map(|(endpoint, metric)| {
            json!({
                "endpoint": endpoint,
                "request_count": metric.request_count,
                "error_count": metric.error_count,
                "error_rate": metric.error_rate(),
                "average_duration_ms": metric.average_duration_ms(),
                "total_duration_ms": metric.total_duration_ms
            })
        })
        .collect();
    endpoint_stats.sort_by(|a, b| a["endpoint"].as_str().cmp(&b["endpoint"].as_str()));

    HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds,
        "overall": {
            "total_requests": metrics.request_count,
            "total_errors": metrics.error_count,
            "error_rate": metrics.error_rate(),
            "requests_per_second": if uptime_seconds > 0 {
                metrics.request_count as f64 / uptime_seconds as f64
            } else {
                0.0
            }
        },
        "jobs": {
            "in_flight": metrics.jobs_in_flight,
            "aligned": metrics.jobs.aligned,
            "rejected": metrics.jobs.rejected,
            "failed": metrics.jobs.failed,
            "timed_out": metrics.jobs.timed_out
        },
        "endpoints": endpoint_stats,
        "memory": get_memory_info()
    }))
}

struct DependencyCheck {
    name: &'static str,
    path: String,
    available: bool,
}

async fn check_dependencies(config: &AppConfig) -> Vec<DependencyCheck> {
    let dirs = [
        ("audio_dir", config.staging.audio_dir.as_path()),
        ("transcript_dir", config.staging.transcript_dir.as_path()),
        ("output_dir", config.staging.output_dir.as_path()),
    ];

    let mut checks = Vec::with_capacity(dirs.len() + 1);
    for (name, path) in dirs {
        checks.push(DependencyCheck {
            name,
            path: path.display().to_string(),
            available: metadata_matches(path, |m| m.is_dir()).await,
        });
    }
    checks.push(DependencyCheck {
        name: "engine_script",
        path: config.engine.script.display().to_string(),
        available: metadata_matches(&config.engine.script, |m| m.is_file()).await,
    });
    checks
}

async fn metadata_matches(path: &Path, check: impl Fn(&std::fs::Metadata) -> bool) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|metadata| check(&metadata))
        .unwrap_or(false)
}

fn get_memory_info() -> serde_json::Value {
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            let kb_field = |prefix: &str| {
                status
                    .lines()
                    .find(|line| line.starts_with(prefix))
                    .and_then(|line| line.split_whitespace().nth(1))
                    .and_then(|kb| kb.parse::<u64>().ok())
                    .map(|kb| kb * 1024)
                    .unwrap_or(0)
            };

            return json!({
                "resident_memory_bytes": kb_field("VmRSS:"),
                "virtual_memory_bytes": kb_field("VmSize:"),
                "available": true
            });
        }
    }

    json!({
        "resident_memory_bytes": 0,
        "virtual_memory_bytes": 0,
        "available": false
    })
}
