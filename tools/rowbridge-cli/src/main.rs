///
/// rowbridge CLI - Query a SQLite database through rowbridge
///
/// Commands:
/// - rowbridge query SQL: Run the query and print every row as pretty JSON
/// - rowbridge describe SQL: Print the column metadata of the query's result
///
/// The database comes from `--db PATH`, from a TOML config given with
/// `--config FILE`, or is an empty in-memory database when neither is set.
///

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

use rowbridge::{ColumnDescriptor, materialize};
use rowbridge_sqlite3::{SqliteConfig, SqliteSession};
use rusqlite::types::Value as SqlValue;
use tracing::{Level, debug};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "rowbridge")]
#[command(author, version, about = "Uniform row iteration over SQL cursors", long_about = None)]
struct Cli {
    /// Raise the log level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a query and print the rows as JSON
    Query(QueryArgs),

    /// Print the column metadata of a query's result
    Describe(QueryArgs),
}

#[derive(Args)]
struct QueryArgs {
    /// SQLite database file
    #[arg(long, conflicts_with = "config")]
    db: Option<PathBuf>,

    /// TOML connection config
    #[arg(long)]
    config: Option<PathBuf>,

    /// The SQL to run
    sql: String,

    /// Positional parameter, bound in order (repeatable)
    #[arg(long = "param", value_name = "VALUE")]
    params: Vec<String>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Query(args) => run_query(&args),
        Commands::Describe(args) => run_describe(&args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_max_level(level)
        .init();
}

fn open_session(args: &QueryArgs) -> CliResult<SqliteSession> {
    let config = match (&args.config, &args.db) {
        (Some(path), _) => SqliteConfig::from_path(path)?,
        (None, Some(db)) => SqliteConfig::file(db),
        (None, None) => SqliteConfig::in_memory(),
    };
    debug!(path = ?config.path, read_only = config.read_only, "opening session");
    Ok(SqliteSession::open(&config)?)
}

fn run_query(args: &QueryArgs) -> CliResult<()> {
    let session = open_session(args)?;
    let params = bind_params(&args.params);
    let mut rows = session.query(&args.sql, rusqlite::params_from_iter(params.iter()))?;

    let maps = materialize(&mut rows);
    rows.close();
    let maps = maps?;

    debug!(rows = maps.len(), "query materialized");
    println!("{}", serde_json::to_string_pretty(&maps)?);
    Ok(())
}

fn run_describe(args: &QueryArgs) -> CliResult<()> {
    let session = open_session(args)?;
    let params = bind_params(&args.params);
    let mut rows = session.query(&args.sql, rusqlite::params_from_iter(params.iter()))?;

    let metadata = rows.metadata();
    rows.close();

    for (i, column) in metadata?.columns().enumerate() {
        println!("{}", describe_line(i + 1, column));
    }
    Ok(())
}

/// Integers and reals are bound as numbers, anything else as text.
fn bind_params(raw: &[String]) -> Vec<SqlValue> {
    raw.iter()
        .map(|s| {
            if let Ok(i) = s.parse::<i64>() {
                SqlValue::Integer(i)
            } else if let Ok(f) = s.parse::<f64>() {
                SqlValue::Real(f)
            } else {
                SqlValue::Text(s.clone())
            }
        })
        .collect()
}

fn describe_line(index: usize, column: &ColumnDescriptor) -> String {
    let declared = if column.type_name.is_empty() {
        "-"
    } else {
        column.type_name.as_str()
    };
    format!(
        "{}\t{}\t{}\t{}\tprecision={}\tscale={}\tnullable={:?}",
        index, column.label, column.sql_type, declared, column.precision, column.scale, column.nullability
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowbridge::SqlType;

    #[test]
    fn test_bind_params_picks_storage_class() {
        let raw = vec!["42".to_string(), "2.5".to_string(), "abc".to_string(), "".to_string()];
        let bound = bind_params(&raw);
        assert_eq!(
            bound,
            vec![
                SqlValue::Integer(42),
                SqlValue::Real(2.5),
                SqlValue::Text("abc".to_string()),
                SqlValue::Text(String::new()),
            ]
        );
    }

    #[test]
    fn test_describe_line() {
        let column = ColumnDescriptor::new("balance", SqlType::Decimal)
            .with_type_name("DECIMAL(10,2)")
            .with_size(12, 10, 2);
        assert_eq!(
            describe_line(3, &column),
            "3\tbalance\tDECIMAL\tDECIMAL(10,2)\tprecision=10\tscale=2\tnullable=Unknown"
        );
    }

    #[test]
    fn test_describe_line_without_declared_type() {
        let column = ColumnDescriptor::new("n", SqlType::Other);
        assert!(describe_line(1, &column).starts_with("1\tn\tOTHER\t-\t"));
    }

    #[test]
    fn test_cli_parses_query_with_params() {
        let cli = Cli::try_parse_from([
            "rowbridge", "-vv", "query", "--db", "people.db", "SELECT ?1, ?2", "--param", "1", "--param", "x",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Query(args) => {
                assert_eq!(args.db, Some(PathBuf::from("people.db")));
                assert_eq!(args.sql, "SELECT ?1, ?2");
                assert_eq!(args.params, vec!["1", "x"]);
            }
            Commands::Describe(_) => panic!("Expected query command"),
        }
    }

    #[test]
    fn test_cli_rejects_db_with_config() {
        let parsed = Cli::try_parse_from([
            "rowbridge", "describe", "--db", "a.db", "--config", "a.toml", "SELECT 1",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_query_against_in_memory_database() {
        let args = QueryArgs {
            db: None,
            config: None,
            sql: "SELECT ?1 AS n".to_string(),
            params: vec!["7".to_string()],
        };
        let session = open_session(&args).unwrap();
        let params = bind_params(&args.params);
        let mut rows = session
            .query(&args.sql, rusqlite::params_from_iter(params.iter()))
            .unwrap();
        let maps = materialize(&mut rows).unwrap();
        assert_eq!(serde_json::to_string(&maps).unwrap(), r#"[{"n":7}]"#);
    }
}
