use std::sync::Arc;

use core_lens::{AuthConfig, JobPipeline};
use data_model_lens::store::UserStore;

/// Everything a request handler needs. Built once by the process entry point.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<JobPipeline>,
    pub users: Arc<dyn UserStore>,
    pub auth: Arc<AuthConfig>,
}

impl AppState {
    pub fn new(pipeline: Arc<JobPipeline>, users: Arc<dyn UserStore>, auth: AuthConfig) -> Self {
        Self {
            pipeline,
            users,
            auth: Arc::new(auth),
        }
    }
}
