/**
 * Middleware Pipeline
 *
 * The pipeline is an ordered list of stages, assembled once from the
 * validated configuration and applied to the fully routed application.
 * The first stage is the outermost layer, so requests pass the stages in
 * list order before reaching any handler, and responses pass them in
 * reverse.
 *
 * # Standard Order
 *
 * 1. `Compression` - response compression (gzip, brotli)
 * 2. `BodyLimit` - ceiling for JSON and URL-encoded bodies
 * 3. `Session` - signed session cookie
 * 4. `ParameterPollution` - duplicate query/body keys collapse
 * 5. `SecurityHeaders` - hardening response headers
 * 6. `Cors` - cross-origin policy
 *
 * Stages 1-4 form the standard group and 5-6 the security group; the
 * orchestrator concatenates them in that order.
 */

use std::sync::Arc;
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware::{from_fn, from_fn_with_state},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowHeaders, AllowOrigin, CorsLayer},
};
use crate::backend::middleware::hpp::{parameter_pollution, PollutionGuard};
use crate::backend::middleware::security::security_headers;
use crate::backend::middleware::session::{session_cookies, SessionSettings};
use crate::backend::server::config::{ConfigError, CorsConfig, MiddlewareConfig, PollutionRule};

/// One request-processing stage
#[derive(Debug, Clone)]
pub enum Stage {
    Compression,
    BodyLimit(usize),
    Session(Arc<SessionSettings>),
    ParameterPollution { rule: PollutionRule, body_limit: usize },
    SecurityHeaders,
    Cors(CorsConfig),
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Compression => "compression",
            Self::BodyLimit(_) => "body_limit",
            Self::Session(_) => "session",
            Self::ParameterPollution { .. } => "parameter_pollution",
            Self::SecurityHeaders => "security_headers",
            Self::Cors(_) => "cors",
        }
    }

    fn layer<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        match self {
            Self::Compression => router.layer(CompressionLayer::new()),
            Self::BodyLimit(limit) => router.layer(DefaultBodyLimit::max(*limit)),
            Self::Session(settings) => {
                router.layer(from_fn_with_state(Arc::clone(settings), session_cookies))
            }
            Self::ParameterPollution { rule, body_limit } => router.layer(from_fn_with_state(
                PollutionGuard {
                    rule: *rule,
                    body_limit: *body_limit,
                },
                parameter_pollution,
            )),
            Self::SecurityHeaders => router.layer(from_fn(security_headers)),
            Self::Cors(cors) => router.layer(cors_layer(cors)),
        }
    }
}

/// Build the CORS layer; `*` reflects the request origin so credentials stay allowed
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origin = if config.origins.iter().any(|origin| origin == "*") {
        AllowOrigin::mirror_request()
    } else {
        AllowOrigin::list(
            config
                .origins
                .iter()
                .filter_map(|origin| HeaderValue::from_str(origin).ok()),
        )
    };
    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(config.methods.clone())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(config.credentials)
}

/// Ordered, immutable once applied
#[derive(Debug, Clone, Default)]
pub struct MiddlewarePipeline {
    stages: Vec<Stage>,
}

impl MiddlewarePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages 1-4: compression, body ceiling, session, parameter pollution
    pub fn standard(config: &MiddlewareConfig) -> Result<Self, ConfigError> {
        let mut pipeline = Self::new();
        if config.compression {
            pipeline = pipeline.push(Stage::Compression);
        }
        let session = SessionSettings::from_config(&config.session)?;
        Ok(pipeline
            .push(Stage::BodyLimit(config.body_limit))
            .push(Stage::Session(Arc::new(session)))
            .push(Stage::ParameterPollution {
                rule: config.parameter_pollution,
                body_limit: config.body_limit,
            }))
    }

    /// Stages 5-6: security headers, CORS
    pub fn security(config: &MiddlewareConfig) -> Self {
        let mut pipeline = Self::new();
        if config.security_headers {
            pipeline = pipeline.push(Stage::SecurityHeaders);
        }
        pipeline.push(Stage::Cors(config.cors.clone()))
    }

    pub fn push(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Append another pipeline's stages after this one's
    pub fn then(mut self, other: MiddlewarePipeline) -> Self {
        self.stages.extend(other.stages);
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(Stage::name).collect()
    }

    /// Wrap the router; the first stage ends up outermost
    pub fn apply<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        self.stages
            .iter()
            .rev()
            .fold(router, |router, stage| stage.layer(router))
    }
}
