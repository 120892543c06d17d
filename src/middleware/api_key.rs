//! API Key 认证中间件
//!
//! 通过 Header 中的 Authorization: Bearer <token> 进行认证；
//! 未配置 Key 时不做认证，健康检查始终放行

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpResponse,
};
use futures::future::{ok, LocalBoxFuture, Ready};
use std::rc::Rc;

use crate::models::ApiResponse;

/// 免认证的健康检查路径
const HEALTH_PATH: &str = "/api/v1/health";

/// API Key 中间件
pub struct ApiKeyMiddleware {
    api_key: Rc<Option<String>>,
}

impl ApiKeyMiddleware {
    /// 空 Key 表示关闭认证
    pub fn new(api_key: String) -> Self {
        let api_key = if api_key.trim().is_empty() {
            None
        } else {
            Some(api_key)
        };
        Self {
            api_key: Rc::new(api_key),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ApiKeyMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = ApiKeyMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(ApiKeyMiddlewareService {
            service: Rc::new(service),
            api_key: self.api_key.clone(),
        })
    }
}

pub struct ApiKeyMiddlewareService<S> {
    service: Rc<S>,
    api_key: Rc<Option<String>>,
}

fn is_authorized(req: &ServiceRequest, expected: &Option<String>) -> bool {
    let Some(expected) = expected else {
        return true;
    };
    if req.path() == HEALTH_PATH {
        return true;
    }
    req.headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map_or(false, |key| key == expected.as_str())
}

impl<S, B> Service<ServiceRequest> for ApiKeyMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let authorized = is_authorized(&req, &self.api_key);

        Box::pin(async move {
            if authorized {
                let res = service.call(req).await?;
                return Ok(res.map_into_left_body());
            }

            log::warn!("拒绝未认证请求: {} {}", req.method(), req.path());
            let response = HttpResponse::Unauthorized()
                .json(ApiResponse::<()>::error("无效的 Bearer Token"));
            Ok(req.into_response(response).map_into_right_body())
        })
    }
}
