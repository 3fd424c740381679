use crate::cli::CheckArgs;
use crate::config::ProjectConfig;
use reqplan::ResourceRegistry;

pub fn run(args: CheckArgs) -> anyhow::Result<()> {
    let project = ProjectConfig::load(args.config.clone())?;
    let registry = project.file.registry()?;

    if args.verbose {
        for (type_id, meta) in registry.iter() {
            println!(
                "{type_id}: table {} ({} selectable, {} sortable, {} relations)",
                meta.table,
                meta.selectable.len(),
                meta.sortable.len(),
                meta.relations.len()
            );
        }
    }

    let issues = check_registry(&registry);
    for issue in &issues {
        eprintln!("error: {issue}");
    }
    if !issues.is_empty() {
        anyhow::bail!("check failed: {} issue(s) in {}", issues.len(), args.config.display());
    }

    println!("ok: {} resources", registry.len());
    Ok(())
}

/// Collect problems that only show up across resources.
fn check_registry(registry: &ResourceRegistry) -> Vec<String> {
    let mut issues = registry.check();
    for (type_id, meta) in registry.iter() {
        for field in &meta.sortable {
            if !meta.can_select(field) {
                issues.push(format!("{type_id}: sortable field '{field}' is not selectable"));
            }
        }
        if let Some(alt) = &meta.alternate_key {
            if !meta.can_select(alt) {
                issues.push(format!("{type_id}: alternate key '{alt}' is not selectable"));
            }
        }
    }
    issues
}
