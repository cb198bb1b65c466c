//! The two fetch strategies must produce identical nested graphs for the
//! same underlying data.

#[cfg(test)]
mod ljoin_tests {
    use serde_json::json;

    use nestql::{Catalog, Dialect, LoadError, Loader, NodeOptions, SpecBlock};

    use crate::common::MockDriver;

    fn column_options() -> Vec<NodeOptions> {
        vec![
            NodeOptions {
                column: Some(nestql::ColumnSpec::List(vec![
                    "id".into(),
                    "title".into(),
                    "author_id".into(),
                ])),
                ..Default::default()
            },
            NodeOptions {
                column: Some(nestql::ColumnSpec::List(vec!["id".into(), "name".into()])),
                ..Default::default()
            },
        ]
    }

    #[tokio::test]
    async fn strategies_agree_on_a_to_one_chain() {
        let walker_driver = MockDriver::new()
            .on(
                "FROM \"posts\"",
                json!([{"id": 1, "title": "t", "author_id": 9}]),
            )
            .on("FROM \"authors\"", json!([{"id": 9, "name": "ann"}]));
        let walker = Loader::new(walker_driver, Dialect::Postgres);

        let join_driver = MockDriver::new().on(
            "LEFT JOIN \"authors\"",
            json!([{
                "posts>_<id": 1,
                "posts>_<title": "t",
                "posts>_<author_id": 9,
                "posts>_<author>_<id": 9,
                "posts>_<author>_<name": "ann",
            }]),
        );
        let joiner = Loader::new(join_driver, Dialect::Postgres);

        let block =
            SpecBlock::with_options("posts\n  - author".to_string(), column_options());
        let batched = walker.associate(&block).await.unwrap();
        let joined = joiner.left_join(&block).await.unwrap();

        assert_eq!(batched, joined);
    }

    #[tokio::test]
    async fn join_miss_matches_the_walker_empty_object() {
        let walker_driver = MockDriver::new().on(
            "FROM \"posts\"",
            json!([{"id": 2, "title": "orphan", "author_id": null}]),
        );
        let walker = Loader::new(walker_driver, Dialect::Postgres);

        let join_driver = MockDriver::new().on(
            "LEFT JOIN \"authors\"",
            json!([{
                "posts>_<id": 2,
                "posts>_<title": "orphan",
                "posts>_<author_id": null,
                "posts>_<author>_<id": null,
                "posts>_<author>_<name": null,
            }]),
        );
        let joiner = Loader::new(join_driver, Dialect::Postgres);

        let block =
            SpecBlock::with_options("posts\n  - author".to_string(), column_options());
        let batched = walker.associate(&block).await.unwrap();
        let joined = joiner.left_join(&block).await.unwrap();

        assert_eq!(batched, joined);
        assert_eq!(joined[0]["_"]["author"], json!({}));
    }

    #[tokio::test]
    async fn to_many_children_fall_back_to_the_batched_walker() {
        let join_driver = MockDriver::new()
            .on(
                "LEFT JOIN \"authors\"",
                json!([{
                    "posts>_<id": 1,
                    "posts>_<title": "t",
                    "posts>_<author_id": 9,
                    "posts>_<author>_<id": 9,
                    "posts>_<author>_<name": "ann",
                }]),
            )
            .on(
                "FROM \"comments\"",
                json!([{"id": 5, "post_id": 1, "body": "hi"}]),
            );
        let joiner = Loader::new(join_driver, Dialect::Postgres);

        let mut options = column_options();
        options.push(NodeOptions::default());
        let block = SpecBlock::with_options(
            "posts\n  - author\n  < comments".to_string(),
            options,
        );
        let graph = joiner.left_join(&block).await.unwrap();

        assert_eq!(graph[0]["_"]["author"], json!({"id": 9, "name": "ann"}));
        assert_eq!(
            graph[0]["_"]["comments"],
            json!([{"id": 5, "post_id": 1, "body": "hi"}])
        );
        let joined_sql = joiner
            .driver()
            .executed()
            .into_iter()
            .find(|text| text.contains("LEFT JOIN"))
            .unwrap();
        assert!(!joined_sql.contains("comments"));
    }

    #[tokio::test]
    async fn catalog_supplies_column_lists_when_options_do_not() {
        let join_driver = MockDriver::new().on(
            "LEFT JOIN \"authors\"",
            json!([{
                "posts>_<id": 1,
                "posts>_<author_id": 9,
                "posts>_<author>_<id": 9,
            }]),
        );
        let mut catalog = Catalog::new();
        catalog.insert("posts", vec!["id".into(), "author_id".into()]);
        catalog.insert("authors", vec!["id".into()]);
        let joiner = Loader::new(join_driver, Dialect::Postgres).with_catalog(catalog);

        let graph = joiner
            .left_join(&SpecBlock::new("posts\n  - author"))
            .await
            .unwrap();
        assert_eq!(graph[0]["_"]["author"], json!({"id": 9}));
    }

    #[tokio::test]
    async fn introspection_builds_the_catalog_from_information_schema() {
        let driver = MockDriver::new()
            .on(
                "information_schema.columns",
                json!([
                    {"table_name": "posts", "column_name": "id"},
                    {"table_name": "posts", "column_name": "title"},
                    {"table_name": "authors", "column_name": "id"},
                ]),
            )
            .on(
                "view_column_usage",
                json!([{"view_name": "post_titles", "column_name": "title"}]),
            );
        let composer = nestql::Composer::new(Dialect::Postgres);

        let catalog = Catalog::introspect(&driver, &composer, "app", "appdb")
            .await
            .unwrap();
        assert_eq!(
            catalog.columns("posts"),
            Some(["id".to_string(), "title".to_string()].as_slice())
        );
        assert_eq!(
            catalog.columns("post_titles"),
            Some(["title".to_string()].as_slice())
        );
    }

    #[tokio::test]
    async fn missing_column_source_is_an_error() {
        let joiner = Loader::new(MockDriver::new(), Dialect::Postgres);
        let result = joiner.left_join(&SpecBlock::new("posts\n  - author")).await;
        assert!(matches!(
            result,
            Err(LoadError::ColumnsRequired(table)) if table == "posts"
        ));
    }
}
