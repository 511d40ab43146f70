use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::json_fields;
use crate::validation::rules;

/// Static payload returned by `GET /example`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleResponse {
    pub app_name: String,
    pub env: String,
}

/// One row of `GET /example/list`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleItem {
    pub id: u32,
    pub name: String,
}

/// Body of `POST /example`.
///
/// Absent fields decode to their zero value, so a missing field is reported
/// by its constraint rather than by the decoder.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ExampleRequest {
    #[serde(rename = "name")]
    #[validate(required, length(min = 3, max = 50))]
    pub title: Option<String>,

    #[serde(rename = "email_address")]
    #[validate(email)]
    pub email: String,

    #[validate(custom(function = "status_choice"))]
    pub status: String,

    #[serde(rename = "qty")]
    #[validate(range(exclusive_min = 0))]
    pub quantity: i64,

    #[validate(nested)]
    pub schedule: Schedule,
}

/// Embedded in [`ExampleRequest`]
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Schedule {
    #[serde(rename = "start_at")]
    #[validate(custom(function = "rules::datetime_format"))]
    pub starts_at: String,

    #[validate(length(max = 140))]
    pub notes: Option<String>,
}

pub const EXAMPLE_STATUSES: &[&str] = &["draft", "published", "archived"];

fn status_choice(value: &str) -> Result<(), validator::ValidationError> {
    rules::one_of(value, EXAMPLE_STATUSES)
}

json_fields!(ExampleRequest {
    title => "name",
    email => "email_address",
    status => "status",
    quantity => "qty",
    schedule => "schedule" nested Schedule,
});

json_fields!(Schedule {
    starts_at => "start_at",
    notes => "notes",
});

/// Pagination query parameters
#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PaginationParams {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(10)
    }

    pub fn offset(&self) -> usize {
        (self.page() as usize - 1) * self.limit() as usize
    }
}
