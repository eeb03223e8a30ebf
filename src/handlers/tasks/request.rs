//! Task request payloads

use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct AddTestRequest {
    pub input: String,
    pub expected_output: String,
    pub time_limit: Option<f64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TrialRunRequest {
    #[validate(length(min = 1))]
    pub language: String,
    #[validate(length(min = 1))]
    pub code: String,
}
