//! Transaction sequencing over the pool traits: one dedicated connection,
//! explicit commit/rollback, release on both outcomes.

#[cfg(test)]
mod transaction_tests {
    use serde_json::json;

    use nestql::{Dialect, Loader, Sql, SpecBlock};

    use crate::common::MockPool;

    fn loader(pool: MockPool) -> Loader<MockPool> {
        Loader::new(pool, Dialect::Postgres)
    }

    #[tokio::test]
    async fn commit_wraps_every_statement_on_one_connection() -> anyhow::Result<()> {
        let loader = loader(MockPool::new().on("FROM \"posts\"", json!([{"id": 1}])));

        let tx = loader.transaction().await?;
        tx.query(&Sql::raw("SELECT * FROM \"posts\"")).await?;
        tx.associate(&SpecBlock::new("posts")).await?;
        tx.commit().await?;

        let log = loader.driver().statement_log();
        assert_eq!(log.first().map(String::as_str), Some("BEGIN"));
        assert_eq!(log.last().map(String::as_str), Some("COMMIT"));
        assert_eq!(log.len(), 4);
        assert!(loader.driver().was_released());
        Ok(())
    }

    #[tokio::test]
    async fn rollback_releases_the_connection_too() {
        let loader = loader(MockPool::new());

        let tx = loader.transaction().await.unwrap();
        tx.insert(
            "posts",
            &[serde_json::from_value(json!({"title": "draft"})).unwrap()],
        )
        .await
        .unwrap();
        tx.rollback().await.unwrap();

        let log = loader.driver().statement_log();
        assert_eq!(log.first().map(String::as_str), Some("BEGIN"));
        assert!(log.iter().any(|s| s.starts_with("INSERT INTO \"posts\"")));
        assert_eq!(log.last().map(String::as_str), Some("ROLLBACK"));
        assert!(loader.driver().was_released());
    }

    #[tokio::test]
    async fn query_failure_leaves_the_decision_to_the_caller() {
        let loader = loader(MockPool::new());

        let tx = loader.transaction().await.unwrap();
        let poisoned = Sql::injection();
        assert!(tx.query(&poisoned).await.is_err());

        // The failed composition never reached the connection; rollback is
        // still the caller's move.
        tx.rollback().await.unwrap();
        assert_eq!(
            loader.driver().statement_log(),
            vec!["BEGIN".to_string(), "ROLLBACK".to_string()]
        );
        assert!(loader.driver().was_released());
    }
}
