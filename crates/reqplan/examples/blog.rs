//! Converting list/show query strings for a small blog schema.
//!
//! Run with: cargo run --example blog -p reqplan
//!
//! Prints the request model and SQL for a few queries. With DATABASE_URL set (in
//! .env or the environment) the plans are also executed against temporary tables.

use reqplan::{
    Action, PlanError, PlanResult, Relation, RequestConverter, ResourceMetadata,
    ResourceRegistry,
};
use std::env;

fn registry() -> PlanResult<ResourceRegistry> {
    let mut registry = ResourceRegistry::new();
    registry
        .register(
            "blog::Post",
            ResourceMetadata::new("post", "posts")
                .with_selectable(&["id", "title", "slug", "author_id"])
                .with_sortable(&["title"])
                .with_alternate_key("slug")
                .with_relation("author", Relation::to_one("blog::User"))
                .with_relation("comments", Relation::to_many("blog::Comment")),
        )?
        .register(
            "blog::User",
            ResourceMetadata::new("user", "users").with_selectable(&["id", "name"]),
        )?
        .register(
            "blog::Comment",
            ResourceMetadata::new("comment", "comments")
                .with_selectable(&["id", "body", "post_id"]),
        )?;
    Ok(registry)
}

#[tokio::main]
async fn main() -> Result<(), PlanError> {
    dotenvy::dotenv().ok();

    let converter = RequestConverter::new(registry()?);
    let queries = [
        (
            Action::Index,
            None,
            "fields[post]=title,secret&fields[author]=name&fields[comments]=body&limit[comments]=2&sorting=-title",
        ),
        (Action::Index, None, "filters[comments]=body%20like%20%25great%25"),
        (Action::Show, Some("hello-world"), "fields[post]=title"),
    ];

    let client = match env::var("DATABASE_URL") {
        Ok(url) => {
            let (client, connection) = tokio_postgres::connect(&url, tokio_postgres::NoTls).await?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    eprintln!("connection error: {e}");
                }
            });
            client
                .batch_execute(
                    "CREATE TEMP TABLE users (id bigint PRIMARY KEY, name text);
                     CREATE TEMP TABLE posts (id bigint PRIMARY KEY, title text, slug text, author_id bigint);
                     CREATE TEMP TABLE comments (id bigint PRIMARY KEY, body text, post_id bigint);
                     INSERT INTO users VALUES (1, 'ada');
                     INSERT INTO posts VALUES (1, 'Hello', 'hello-world', 1), (2, 'Again', 'again', 1);
                     INSERT INTO comments VALUES (1, 'great', 1), (2, 'also great', 1), (3, 'ok', 2);",
                )
                .await?;
            Some(client)
        }
        Err(_) => None,
    };

    for (action, id, query) in queries {
        println!("=== {action} ?{query} ===");
        let conversion = converter.convert_query("blog::Post", query, action, id)?;
        println!(
            "request: {}",
            serde_json::to_string_pretty(&conversion.request)
                .map_err(|e| PlanError::Other(e.to_string()))?
        );
        println!("sql: {}", conversion.plan.to_sql()?.to_sql());

        if let Some(client) = &client {
            let result = match action {
                Action::Index => serde_json::to_value(conversion.plan.fetch_page(client).await?),
                Action::Show => serde_json::to_value(conversion.plan.fetch_one(client).await?),
            }
            .map_err(|e| PlanError::Other(e.to_string()))?;
            println!("result: {result:#}");
        }
        println!();
    }

    Ok(())
}
