//! Per-endpoint request metrics.
//!
//! Endpoints are keyed by route pattern (`POST /process/{lang_code}`) rather
//! than by raw path, so every language shares one entry.

use crate::state::AppState;
use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error,
};
use futures_util::future::LocalBoxFuture;
use std::{
    future::{ready, Ready},
    time::Instant,
};

pub struct MetricsMiddleware;

impl<S, B> Transform<S, ServiceRequest> for MetricsMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = MetricsMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(MetricsMiddlewareService { service }))
    }
}

pub struct MetricsMiddlewareService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for MetricsMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start_time = Instant::now();

        if let Some(app_state) = req.app_data::<web::Data<AppState>>() {
            app_state.increment_request_count();
        }

        let fut = self.service.call(req);

        Box::pin(async move {
            let result = fut.await;
            let duration_ms = start_time.elapsed().as_millis() as u64;

            // Routing has run by now, so the matched pattern is known.
            if let Ok(response) = &result {
                let request = response.request();
                if let Some(app_state) = request.app_data::<web::Data<AppState>>() {
                    let route = request
                        .match_pattern()
                        .unwrap_or_else(|| "unmatched".to_string());
                    let endpoint = format!("{} {}", request.method(), route);
                    let status = response.status();
                    let is_error = status.is_client_error() || status.is_server_error();

                    app_state.record_endpoint_request(&endpoint, duration_ms, is_error);
                    if is_error {
                        app_state.increment_error_count();
                    }
                }
            }

            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::AlignmentService;
    use crate::config::AppConfig;
    use actix_web::{test, App, HttpResponse};

    #[actix_web::test]
    async fn test_records_by_route_pattern() {
        let config = AppConfig::default();
        let service = AlignmentService::from_config(&config);
        let state = AppState::new(config, service);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .wrap(MetricsMiddleware)
                .route(
                    "/process/{lang_code}",
                    web::post().to(|| async { HttpResponse::BadRequest().finish() }),
                ),
        )
        .await;

        for lang in ["fi", "en", "se"] {
            let req = test::TestRequest::post().uri(&format!("/process/{}", lang)).to_request();
            test::call_service(&app, req).await;
        }

        let snapshot = state.get_metrics_snapshot();
        assert_eq!(snapshot.request_count, 3);
        assert_eq!(snapshot.error_count, 3);
        let metric = &snapshot.endpoint_metrics["POST /process/{lang_code}"];
        assert_eq!(metric.request_count, 3);
        assert_eq!(metric.error_rate(), 1.0);
    }
}
