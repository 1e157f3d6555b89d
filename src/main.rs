use anyhow::{anyhow, Context, Result};
use crossterm::style::Stylize;
use std::path::Path;

use table_state::config::Config;
use table_state::data::loaders::load_records;
use table_state::logging::{get_log_buffer, init_tracing};
use table_state::state::{EngineOptions, InitialState, SortSpec, TableStateEngine};
use table_state::table_display::{display_page, export_to_csv};
use table_state::url_state::{
    decode_compact, decode_query, encode_compact, encode_query, remote_query_string, RemoteDialect,
};

/// Flags that take a value; their values are never treated as the data file
const VALUE_FLAGS: [&str; 9] = [
    "--query",
    "--state",
    "--search-keys",
    "--search",
    "--sort",
    "--page",
    "--page-size",
    "--remote",
    "--export",
];

fn print_help() {
    println!("{}", "table-state - filter, sort and page a JSON or CSV file".blue().bold());
    println!();
    println!("{}", "Usage:".yellow());
    println!("  table-state [OPTIONS] FILE.json|FILE.csv");
    println!();
    println!("{}", "Options:".yellow());
    println!("  {}          - Seed state from a URL query string", "--query <QS>".green());
    println!("  {}      - Seed state from the compact base64 form", "--state <BASE64>".green());
    println!("  {}     - Fields used by the global search", "--search-keys a,b".green());
    println!("  {}       - Commit a search", "--search <TERM>".green());
    println!("  {} - Sort by a field", "--sort <field[:desc]>".green());
    println!("  {}            - Go to page N", "--page <N>".green());
    println!("  {}       - Rows per page", "--page-size <N>".green());
    println!("  {}              - Print the query and compact forms of the state", "--encode".green());
    println!("  {}  - Print the server query for the state", "--remote <paginate|bracket>".green());
    println!("  {}   - Write the filtered, sorted records to CSV", "--export <FILE.csv>".green());
    println!("  {}           - Print captured log lines after the table", "--show-logs".green());
    println!("  {}     - Write a commented default config file", "--generate-config".green());
    println!("  {}                - Show this help", "--help".green());
    println!();
    println!("{}", "Example:".yellow());
    println!("  table-state orders.json --query 'sort=price&dir=desc&filter_status=open'");
    println!();
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|arg| arg == flag)
        .and_then(|pos| args.get(pos + 1))
        .map(String::as_str)
}

fn parse_count(args: &[String], flag: &str) -> Result<Option<usize>> {
    flag_value(args, flag)
        .map(|value| {
            value
                .parse::<usize>()
                .with_context(|| format!("{} expects a number, got '{}'", flag, value))
        })
        .transpose()
}

fn data_file(args: &[String]) -> Option<&str> {
    args.iter()
        .enumerate()
        .skip(1)
        .filter(|(i, arg)| {
            !arg.starts_with("--") && !VALUE_FLAGS.contains(&args[i - 1].as_str())
        })
        .map(|(_, arg)| arg.as_str())
        .find(|arg| arg.ends_with(".json") || arg.ends_with(".csv"))
}

fn generate_config() -> Result<()> {
    let path = Config::get_config_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Error creating config directory: {}", parent.display()))?;
    }
    std::fs::write(&path, Config::create_default_with_comments())
        .with_context(|| format!("Error writing config file: {}", path.display()))?;
    println!("Configuration file created at: {:?}", path);
    println!("Edit this file to change the table defaults.");
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_help();
        return Ok(());
    }

    if args.iter().any(|arg| arg == "--generate-config") {
        return generate_config();
    }

    let Some(file) = data_file(&args) else {
        print_help();
        return Err(anyhow!("No data file given"));
    };

    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("{}", format!("Using default config: {:#}", e).yellow());
        Config::default()
    });
    let default_limit = config.table.default_page_size;

    let loaded = load_records(file)?;
    let columns = loaded.columns;

    let initial = if let Some(query) = flag_value(&args, "--query") {
        decode_query(query, default_limit)
    } else if let Some(encoded) = flag_value(&args, "--state") {
        decode_compact(encoded, default_limit)
    } else {
        InitialState::with_page_size(default_limit)
    };

    let search_keys: Vec<String> = match flag_value(&args, "--search-keys") {
        Some(keys) => keys
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(String::from)
            .collect(),
        None => columns.clone(),
    };
    let options = EngineOptions::from(&config.table).with_search_keys(search_keys);
    let mut engine = TableStateEngine::with_initial_state(loaded.records, options, initial);

    if let Some(term) = flag_value(&args, "--search") {
        engine.on_search_input(term);
        engine.submit_search();
    }

    if let Some(sort) = flag_value(&args, "--sort") {
        let spec = SortSpec::parse(sort)
            .ok_or_else(|| anyhow!("--sort expects field or field:desc, got '{}'", sort))?;
        engine.set_sort(Some(spec));
    }

    if let Some(size) = parse_count(&args, "--page-size")? {
        if !engine.set_page_size(size) {
            eprintln!("{}", format!("Ignoring page size {}", size).yellow());
        }
    }
    if let Some(page) = parse_count(&args, "--page")? {
        if !engine.set_page(page) {
            eprintln!("{}", format!("Ignoring page {}", page).yellow());
        }
    }

    display_page(engine.state(), &columns, &config.display);

    let persisted = engine.persisted_state();
    if args.iter().any(|arg| arg == "--encode") {
        println!();
        println!("{} {}", "query:".cyan(), encode_query(&persisted, default_limit));
        println!("{} {}", "state:".cyan(), encode_compact(&persisted, default_limit)?);
    }

    if let Some(dialect) = flag_value(&args, "--remote") {
        let dialect: RemoteDialect = dialect.parse()?;
        println!("{} {}", format!("{}:", dialect).cyan(), remote_query_string(&persisted, dialect));
    }

    if let Some(target) = flag_value(&args, "--export") {
        export_to_csv(&engine.state().sorted, &columns, Path::new(target))?;
        println!(
            "{}",
            format!("Exported {} records to {}", engine.state().sorted.len(), target).green()
        );
    }

    if args.iter().any(|arg| arg == "--show-logs") {
        if let Some(buffer) = get_log_buffer() {
            println!();
            for entry in buffer.get_recent(100) {
                println!("{}", entry.format_for_display().dark_grey());
            }
        }
    }

    engine.dispose();
    Ok(())
}
