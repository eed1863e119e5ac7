// handlers/onboarding/portal.rs - POST /api/portal/detect handler

use serde::Deserialize;

use crate::api::ApiJson;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{detect_healthcare_portal, PortalDetection};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectPortalRequest {
    #[serde(default)]
    pub url: String,
    pub page_title: Option<String>,
    pub site_name: Option<String>,
}

/// POST /api/portal/detect - Quick-add suggestion for a page
///
/// `data` is `null` when the page does not look like a healthcare portal.
pub async fn detect(ApiJson(body): ApiJson<DetectPortalRequest>) -> ApiResult<Option<PortalDetection>> {
    if body.url.trim().is_empty() {
        return Err(ApiError::validation_error("URL is required", None));
    }
    let detection = detect_healthcare_portal(&body.url, body.page_title.as_deref(), body.site_name.as_deref());
    Ok(ApiResponse::success(detection))
}
