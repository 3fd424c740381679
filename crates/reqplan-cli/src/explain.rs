use crate::cli::QueryArgs;
use crate::config::ProjectConfig;
use reqplan::{Action, Conversion};

pub fn run(args: QueryArgs) -> anyhow::Result<()> {
    let project = ProjectConfig::load(args.config.clone())?;
    let conversion = convert(&project, &args)?;
    print!("{}", render(&conversion)?);
    Ok(())
}

/// Convert the query described by `args` with the project's resources.
pub fn convert(project: &ProjectConfig, args: &QueryArgs) -> anyhow::Result<Conversion> {
    let converter = project.converter()?;
    let action = if args.show.is_some() {
        Action::Show
    } else {
        Action::Index
    };
    let conversion =
        converter.convert_query(&args.resource, &args.query, action, args.show.as_deref())?;
    if conversion.request.has_errors() {
        for err in &conversion.request.errors {
            eprintln!("warning: {err}");
        }
        tracing::debug!(
            errors = conversion.request.errors.len(),
            "request parameters were dropped"
        );
    }
    Ok(conversion)
}

fn render(conversion: &Conversion) -> anyhow::Result<String> {
    let sql = conversion.plan.to_sql()?;
    Ok(format!(
        "-- request\n{}\n-- sql\n{}\n-- params: {}\n",
        serde_json::to_string_pretty(&conversion.request)?,
        sql.to_sql(),
        sql.param_count()
    ))
}
