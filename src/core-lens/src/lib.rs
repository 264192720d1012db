pub mod analyzer;
pub mod common;
pub mod pipeline;

pub use analyzer::{AnalyzeError, HttpFetcher, PageAnalyzer, PageFetcher, analyze_html};
pub use common::{
    AuthConfig, DEFAULT_LOG_SETTINGS, FetchConfig, check_non_empty_env_vars, get_api_base_url, get_auth_config,
    get_db_pool, get_fetch_config, get_frontend_origin, setup_logging,
};
pub use pipeline::{BatchAborted, JobPipeline, PipelineError, Transition};
