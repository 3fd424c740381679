use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpTopic {
    Root,
    Explain,
    Run,
    Check,
}

#[derive(Debug, Clone)]
pub enum Command {
    Help(HelpTopic),
    Explain(QueryArgs),
    Run(QueryArgs),
    Check(CheckArgs),
}

impl Command {
    pub fn verbose(&self) -> bool {
        match self {
            Command::Help(_) => false,
            Command::Explain(args) | Command::Run(args) => args.verbose,
            Command::Check(args) => args.verbose,
        }
    }
}

/// Arguments shared by `explain` and `run`.
#[derive(Debug, Clone)]
pub struct QueryArgs {
    pub config: PathBuf,
    pub database: Option<String>,
    pub resource: String,
    pub show: Option<String>,
    pub query: String,
    pub verbose: bool,
}

#[derive(Debug, Clone)]
pub struct CheckArgs {
    pub config: PathBuf,
    pub verbose: bool,
}

pub fn parse_args(args: &[String]) -> anyhow::Result<Command> {
    let mut it = args.iter().skip(1);
    let Some(first) = it.next() else {
        return Ok(Command::Help(HelpTopic::Root));
    };

    match first.as_str() {
        "-h" | "--help" | "help" => Ok(Command::Help(match it.next().map(|s| s.as_str()) {
            None => HelpTopic::Root,
            Some("explain") => HelpTopic::Explain,
            Some("run") => HelpTopic::Run,
            Some("check") => HelpTopic::Check,
            Some(other) => anyhow::bail!("unknown command: {other}"),
        })),
        "explain" => {
            parse_query(it.map(|s| s.as_str()), HelpTopic::Explain).map(|parsed| match parsed {
                Ok(args) => Command::Explain(args),
                Err(topic) => Command::Help(topic),
            })
        }
        "run" => parse_query(it.map(|s| s.as_str()), HelpTopic::Run).map(|parsed| match parsed {
            Ok(args) => Command::Run(args),
            Err(topic) => Command::Help(topic),
        }),
        "check" => parse_check(it.map(|s| s.as_str())),
        _ => anyhow::bail!("unknown command: {first}"),
    }
}

/// Parse `explain`/`run` arguments; `Err(topic)` means help was requested.
fn parse_query<'a>(
    mut it: impl Iterator<Item = &'a str>,
    topic: HelpTopic,
) -> anyhow::Result<Result<QueryArgs, HelpTopic>> {
    let mut config = PathBuf::from("reqplan.toml");
    let mut database: Option<String> = None;
    let mut resource: Option<String> = None;
    let mut show: Option<String> = None;
    let mut query: Option<String> = None;
    let mut verbose = false;

    while let Some(token) = it.next() {
        match token {
            "-h" | "--help" => return Ok(Err(topic)),
            "-v" | "--verbose" => verbose = true,
            "--config" => {
                let Some(v) = it.next() else {
                    anyhow::bail!("--config requires a value");
                };
                config = PathBuf::from(v);
            }
            "--database" => {
                let Some(v) = it.next() else {
                    anyhow::bail!("--database requires a value");
                };
                database = Some(v.to_string());
            }
            "--resource" => {
                let Some(v) = it.next() else {
                    anyhow::bail!("--resource requires a value");
                };
                resource = Some(v.to_string());
            }
            "--show" => {
                let Some(v) = it.next() else {
                    anyhow::bail!("--show requires a value");
                };
                show = Some(v.to_string());
            }
            _ if token.starts_with("--config=") => {
                config = PathBuf::from(token.trim_start_matches("--config="));
            }
            _ if token.starts_with("--database=") => {
                database = Some(token.trim_start_matches("--database=").to_string());
            }
            _ if token.starts_with("--resource=") => {
                resource = Some(token.trim_start_matches("--resource=").to_string());
            }
            _ if token.starts_with("--show=") => {
                show = Some(token.trim_start_matches("--show=").to_string());
            }
            other if other.starts_with('-') => anyhow::bail!("unknown argument: {other}"),
            other => {
                if query.is_some() {
                    anyhow::bail!("unexpected extra argument: {other}");
                }
                query = Some(other.trim_start_matches('?').to_string());
            }
        }
    }

    let Some(resource) = resource else {
        anyhow::bail!("--resource is required");
    };

    Ok(Ok(QueryArgs {
        config,
        database,
        resource,
        show,
        query: query.unwrap_or_default(),
        verbose,
    }))
}

fn parse_check<'a>(mut it: impl Iterator<Item = &'a str>) -> anyhow::Result<Command> {
    let mut config = PathBuf::from("reqplan.toml");
    let mut verbose = false;

    while let Some(token) = it.next() {
        match token {
            "-h" | "--help" => return Ok(Command::Help(HelpTopic::Check)),
            "-v" | "--verbose" => verbose = true,
            "--config" => {
                let Some(v) = it.next() else {
                    anyhow::bail!("--config requires a value");
                };
                config = PathBuf::from(v);
            }
            _ if token.starts_with("--config=") => {
                config = PathBuf::from(token.trim_start_matches("--config="));
            }
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }

    Ok(Command::Check(CheckArgs { config, verbose }))
}

pub fn print_help(topic: HelpTopic) {
    match topic {
        HelpTopic::Root => {
            println!(
                "\
reqplan - turn list/show query parameters into Postgres queries

USAGE:
  reqplan <COMMAND> [OPTIONS]

COMMANDS:
  explain       Convert a query string and print the request and SQL
  run           Convert a query string and execute it
  check         Validate the resources declared in the config file

Run `reqplan <command> --help` for more."
            );
        }
        HelpTopic::Explain => {
            println!(
                "\
USAGE:
  reqplan explain --resource <TYPE> [OPTIONS] [QUERY]

OPTIONS:
  --config <FILE>       Config file path (default: reqplan.toml)
  --resource <TYPE>     Resource type to convert for
  --show <ID>           Convert for a single entity instead of a list
  -v, --verbose         Log each conversion step

EXAMPLE:
  reqplan explain --resource Post 'fields[post]=title&fields[author]=name&sorting=-title'"
            );
        }
        HelpTopic::Run => {
            println!(
                "\
USAGE:
  reqplan run --resource <TYPE> [OPTIONS] [QUERY]

OPTIONS:
  --config <FILE>       Config file path (default: reqplan.toml)
  --database <URL>      Override database.url from config
  --resource <TYPE>     Resource type to convert for
  --show <ID>           Fetch a single entity instead of a page
  -v, --verbose         Log each conversion step and the executed SQL"
            );
        }
        HelpTopic::Check => {
            println!(
                "\
USAGE:
  reqplan check [OPTIONS]

OPTIONS:
  --config <FILE>       Config file path (default: reqplan.toml)
  -v, --verbose         Print every registered resource"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("reqplan")
            .chain(list.iter().copied())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn no_args_prints_root_help() {
        let cmd = parse_args(&args(&[])).unwrap();
        assert!(matches!(cmd, Command::Help(HelpTopic::Root)));
    }

    #[test]
    fn parse_explain_with_query() {
        let cmd = parse_args(&args(&[
            "explain",
            "--resource",
            "blog::Post",
            "--config=blog.toml",
            "?fields[post]=title&sorting=-title",
        ]))
        .unwrap();
        let Command::Explain(explain) = cmd else {
            panic!("expected explain");
        };

        assert_eq!(explain.resource, "blog::Post");
        assert_eq!(explain.config, PathBuf::from("blog.toml"));
        assert_eq!(explain.query, "fields[post]=title&sorting=-title");
        assert!(explain.show.is_none());
        assert!(!explain.verbose);
    }

    #[test]
    fn parse_run_show() {
        let cmd = parse_args(&args(&[
            "run",
            "--resource=Post",
            "--show",
            "my-slug",
            "--database",
            "postgres://localhost/blog",
            "-v",
        ]))
        .unwrap();
        assert!(cmd.verbose());
        let Command::Run(run) = cmd else {
            panic!("expected run");
        };

        assert_eq!(run.show.as_deref(), Some("my-slug"));
        assert_eq!(run.database.as_deref(), Some("postgres://localhost/blog"));
        assert_eq!(run.config, PathBuf::from("reqplan.toml"));
        assert_eq!(run.query, "");
    }

    #[test]
    fn command_help_wins_over_missing_resource() {
        let cmd = parse_args(&args(&["run", "--help"])).unwrap();
        assert!(matches!(cmd, Command::Help(HelpTopic::Run)));

        let cmd = parse_args(&args(&["help", "check"])).unwrap();
        assert!(matches!(cmd, Command::Help(HelpTopic::Check)));
    }

    #[test]
    fn missing_resource_is_an_error() {
        let err = parse_args(&args(&["explain", "sorting=title"])).unwrap_err();
        assert_eq!(err.to_string(), "--resource is required");
    }

    #[test]
    fn unknown_flags_are_rejected() {
        assert!(parse_args(&args(&["check", "--deny-warnings"])).is_err());
        assert!(parse_args(&args(&["explain", "--resource", "Post", "--bogus"])).is_err());
        assert!(parse_args(&args(&["explain", "--resource"])).is_err());
        assert!(parse_args(&args(&["migrate"])).is_err());
    }
}
