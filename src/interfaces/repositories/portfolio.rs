use async_trait::async_trait;
use dashmap::DashMap;

use crate::{entities::media::MediaItem, errors::AppError};

/// Store abstraction for saved portfolios. The in-memory implementation
/// below is deliberately volatile; a durable backend can replace it
/// without touching the handlers.
#[async_trait]
pub trait PortfolioRepository: Send + Sync {
    /// Replaces the user's entire item list. Last writer wins, no merge.
    async fn save(&self, user_id: &str, items: Vec<MediaItem>) -> Result<(), AppError>;

    /// Returns the saved items in order, or an empty list for unknown users.
    async fn load(&self, user_id: &str) -> Result<Vec<MediaItem>, AppError>;
}

#[derive(Default)]
pub struct InMemoryPortfolioRepo {
    portfolios: DashMap<String, Vec<MediaItem>>,
}

impl InMemoryPortfolioRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PortfolioRepository for InMemoryPortfolioRepo {
    async fn save(&self, user_id: &str, items: Vec<MediaItem>) -> Result<(), AppError> {
        self.portfolios.insert(user_id.to_string(), items);
        Ok(())
    }

    async fn load(&self, user_id: &str) -> Result<Vec<MediaItem>, AppError> {
        Ok(self
            .portfolios
            .get(user_id)
            .map(|entry| entry.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn item(id: &str) -> MediaItem {
        MediaItem {
            id: id.to_string(),
            filename: format!("{id}.png"),
            media_type: "image/png".to_string(),
            title: format!("Item {id}"),
            description: String::new(),
            category: "test".to_string(),
            technical_metadata: None,
            upload_date: "2025-01-01T00:00:00+00:00".to_string(),
        }
    }

    #[tokio::test]
    async fn load_after_save_preserves_order() {
        let repo = InMemoryPortfolioRepo::new();
        repo.save("alice", vec![item("a"), item("b")]).await.unwrap();

        let items = repo.load("alice").await.unwrap();
        assert_eq!(items, vec![item("a"), item("b")]);
    }

    #[tokio::test]
    async fn unknown_user_loads_empty() {
        let repo = InMemoryPortfolioRepo::new();
        assert!(repo.load("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_replaces_wholesale() {
        let repo = InMemoryPortfolioRepo::new();
        repo.save("alice", vec![item("a"), item("b")]).await.unwrap();
        repo.save("alice", vec![item("c")]).await.unwrap();

        let items = repo.load("alice").await.unwrap();
        assert_eq!(items, vec![item("c")]);
    }

    #[tokio::test]
    async fn users_are_isolated() {
        let repo = InMemoryPortfolioRepo::new();
        repo.save("alice", vec![item("a")]).await.unwrap();
        repo.save("bob", vec![item("b")]).await.unwrap();

        assert_eq!(repo.load("alice").await.unwrap(), vec![item("a")]);
        assert_eq!(repo.load("bob").await.unwrap(), vec![item("b")]);
    }

    #[tokio::test]
    async fn concurrent_saves_end_with_one_full_list() {
        let repo = Arc::new(InMemoryPortfolioRepo::new());
        let first = vec![item("a"), item("b")];
        let second = vec![item("c"), item("d")];

        let (r1, r2) = tokio::join!(
            {
                let repo = repo.clone();
                let items = first.clone();
                async move { repo.save("alice", items).await }
            },
            {
                let repo = repo.clone();
                let items = second.clone();
                async move { repo.save("alice", items).await }
            }
        );
        r1.unwrap();
        r2.unwrap();

        let stored = repo.load("alice").await.unwrap();
        // Last write wins wholesale, never an interleaving
        assert!(stored == first || stored == second);
    }
}
