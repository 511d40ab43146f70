use crate::models::{ExampleItem, ExampleResponse};

/// Data access for the example resource.
pub trait ExampleRepository: Send + Sync {
    fn get_example(&self) -> ExampleResponse;

    /// One page of items plus the total item count.
    fn list_examples(&self, offset: usize, limit: usize) -> (Vec<ExampleItem>, u64);
}

/// Serves fixed data; stands in until a real store is wired up.
pub struct StaticExampleRepository {
    items: Vec<ExampleItem>,
}

impl StaticExampleRepository {
    pub fn new() -> Self {
        let items = ["alpha", "bravo", "charlie", "delta", "echo", "foxtrot", "golf", "hotel",
            "india", "juliett", "kilo", "lima", "mike", "november", "oscar", "papa", "quebec",
            "romeo", "sierra", "tango", "uniform", "victor", "whiskey", "xray", "yankee"]
            .iter()
            .zip(1u32..)
            .map(|(name, id)| ExampleItem {
                id,
                name: name.to_string(),
            })
            .collect();
        Self { items }
    }
}

impl Default for StaticExampleRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl ExampleRepository for StaticExampleRepository {
    fn get_example(&self) -> ExampleResponse {
        log::info!("GetExample");
        ExampleResponse {
            app_name: "Example".to_string(),
            env: "DEV".to_string(),
        }
    }

    fn list_examples(&self, offset: usize, limit: usize) -> (Vec<ExampleItem>, u64) {
        let page = self
            .items
            .iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        (page, self.items.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_a_window_and_the_total() {
        let repo = StaticExampleRepository::new();
        let (page, total) = repo.list_examples(20, 10);
        assert_eq!(total, 25);
        assert_eq!(page.len(), 5);
        assert_eq!(page[0].name, "uniform");
    }
}
