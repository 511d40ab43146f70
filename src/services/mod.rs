use std::sync::Arc;

use crate::errors::ApiError;
use crate::models::{ExampleItem, ExampleRequest, ExampleResponse, PaginationParams};
use crate::repository::ExampleRepository;
use crate::response::{set_base_meta, PaginationMeta};

/// Example service for business logic
pub struct ExampleService {
    repo: Arc<dyn ExampleRepository>,
}

impl ExampleService {
    pub fn new(repo: Arc<dyn ExampleRepository>) -> Self {
        Self { repo }
    }

    pub fn get_example(&self) -> ExampleResponse {
        self.repo.get_example()
    }

    /// Items of the requested page with their pagination metadata.
    pub fn list_examples(
        &self,
        params: &PaginationParams,
    ) -> Result<(Vec<ExampleItem>, PaginationMeta), ApiError> {
        let limit = params.limit();
        let (items, total) = self.repo.list_examples(params.offset(), limit as usize);
        let meta = set_base_meta(params.page(), limit, total)?;
        Ok((items, meta))
    }

    /// Accepts an already validated payload and echoes it back.
    pub fn create_example(&self, payload: ExampleRequest) -> ExampleRequest {
        log::info!(
            "CreateExample status={} qty={}",
            payload.status,
            payload.quantity
        );
        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::StaticExampleRepository;

    fn service() -> ExampleService {
        ExampleService::new(Arc::new(StaticExampleRepository::new()))
    }

    #[test]
    fn list_builds_meta_from_total() {
        let params = PaginationParams {
            page: Some(3),
            limit: Some(10),
        };
        let (items, meta) = service().list_examples(&params).unwrap();
        assert_eq!(items.len(), 5);
        assert_eq!(meta.total_data, 25);
        assert_eq!(meta.total_page, 3);
        assert_eq!(meta.page, 3);
    }

    #[test]
    fn zero_limit_is_bad_request() {
        let params = PaginationParams {
            page: Some(1),
            limit: Some(0),
        };
        assert!(matches!(
            service().list_examples(&params),
            Err(ApiError::BadRequest)
        ));
    }
}
