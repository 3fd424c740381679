use crate::cli::QueryArgs;
use crate::config::ProjectConfig;
use crate::explain::convert;
use tokio_postgres::NoTls;

pub async fn run(args: QueryArgs) -> anyhow::Result<()> {
    let project = ProjectConfig::load(args.config.clone())?;
    let database_url = project.database_url(args.database.as_deref())?;
    let conversion = convert(&project, &args)?;

    let client = connect_db(&database_url).await?;
    let out = if conversion.plan.is_single() {
        let row = conversion.plan.fetch_one(&client).await?;
        serde_json::to_string_pretty(&row)?
    } else {
        let page = conversion.plan.fetch_page(&client).await?;
        tracing::info!(
            rows = page.data.len(),
            next_page = ?page.next_page,
            "fetched page"
        );
        serde_json::to_string_pretty(&page)?
    };
    println!("{out}");
    Ok(())
}

pub async fn connect_db(database_url: &str) -> anyhow::Result<tokio_postgres::Client> {
    let (client, connection) = tokio_postgres::connect(database_url, NoTls).await?;
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            eprintln!("postgres connection error: {e}");
        }
    });
    Ok(client)
}
