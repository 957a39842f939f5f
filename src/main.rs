use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser as ClapParser, Subcommand};
use manyleb_ide::analysis::{apply_edits, Analysis, BlockContext, LineCol};
use manyleb_ide::config::{Config, ConfigError};
use manyleb_ide::formatter::ExternalFormatter;
use miette::GraphicalReportHandler;
use owo_colors::{OwoColorize, Rgb};
use serde_json::json;

const LUMINOUS: Rgb = Rgb(0, 255, 65);
const ACID: Rgb = Rgb(173, 255, 47);
const FOREST: Rgb = Rgb(0, 143, 17);

#[derive(ClapParser)]
#[command(name = "manyleb-ide")]
#[command(about = "Editor queries for manyleb API descriptions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Config file (defaults to the nearest manyleb-ide.json)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// [ SYMBOLS ] List declared object types
    Symbols {
        file: PathBuf,
    },
    /// [ DEFINITION ] Find where an object type is declared
    Definition {
        file: PathBuf,
        /// Object name to look up
        name: String,
    },
    /// [ RENAME ] Rename every occurrence of an identifier
    Rename {
        file: PathBuf,
        /// Current name
        from: String,
        /// New name
        to: String,
        /// Rewrite the file instead of printing the edits
        #[arg(short, long)]
        write: bool,
    },
    /// [ COMPLETE ] Completion candidates at a cursor position
    Complete {
        file: PathBuf,
        /// Cursor as LINE:COLUMN, both 1-based
        #[arg(value_parser = parse_position)]
        position: LineCol,
    },
    /// [ CONTEXT ] Enclosing block at a cursor position
    Context {
        file: PathBuf,
        /// Cursor as LINE:COLUMN, both 1-based
        #[arg(value_parser = parse_position)]
        position: LineCol,
    },
    /// [ FORMAT ] Run the external formatter on a file
    Format {
        file: PathBuf,
    },
}

fn parse_position(s: &str) -> Result<LineCol, String> {
    let (line, column) = s
        .split_once(':')
        .ok_or_else(|| format!("expected LINE:COLUMN, got '{}'", s))?;
    let line: u32 = line.parse().map_err(|_| format!("invalid line '{}'", line))?;
    let column: u32 = column.parse().map_err(|_| format!("invalid column '{}'", column))?;
    if line == 0 || column == 0 {
        return Err("line and column start at 1".to_string());
    }
    Ok(LineCol::new(line - 1, column - 1))
}

fn main() {
    let cli = Cli::parse();

    let code = match &cli.command {
        Commands::Symbols { file } => run_symbols(file, cli.json),
        Commands::Definition { file, name } => run_definition(file, name, cli.json),
        Commands::Rename { file, from, to, write } => run_rename(file, from, to, *write, cli.json),
        Commands::Complete { file, position } => run_complete(file, *position, cli.json),
        Commands::Context { file, position } => run_context(file, *position, cli.json),
        Commands::Format { file } => run_format(file, cli.config.as_deref()),
    };

    process::exit(code);
}

fn load_document(path: &Path) -> Option<Analysis> {
    match fs::read_to_string(path) {
        Ok(text) => Some(Analysis::new(text, 0)),
        Err(e) => {
            eprintln!(
                "{} {}: {}",
                "Error reading".bright_red().bold(),
                path.display(),
                e
            );
            None
        }
    }
}

/// Explicit `--config`, else the nearest config above `file`, else defaults.
fn load_config(explicit: Option<&Path>, file: &Path) -> Result<Config, ConfigError> {
    if let Some(path) = explicit {
        return Config::load(path);
    }

    let start = file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    match Config::find_and_load(start) {
        Err(ConfigError::NotFound) => Ok(Config::default()),
        other => other,
    }
}

fn location(analysis: &Analysis, offset: usize) -> String {
    let pos = analysis.position_at(offset);
    format!("{}:{}", pos.line + 1, pos.character + 1)
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("{} {}", "Error encoding JSON:".bright_red().bold(), e),
    }
}

fn run_symbols(file: &Path, as_json: bool) -> i32 {
    let Some(analysis) = load_document(file) else {
        return 1;
    };

    if as_json {
        let entries: Vec<_> = analysis
            .symbols()
            .iter()
            .map(|entry| {
                let pos = analysis.position_at(entry.range.start);
                json!({
                    "name": entry.name,
                    "line": pos.line,
                    "character": pos.character,
                    "range": entry.range,
                    "extent": entry.extent,
                })
            })
            .collect();
        print_json(&json!(entries));
        return 0;
    }

    if analysis.symbols().is_empty() {
        println!("{}", "No object types declared.".truecolor(FOREST.0, FOREST.1, FOREST.2));
        return 0;
    }
    for entry in analysis.symbols() {
        println!(
            "{}  {}",
            location(&analysis, entry.range.start).truecolor(FOREST.0, FOREST.1, FOREST.2),
            entry.name.truecolor(LUMINOUS.0, LUMINOUS.1, LUMINOUS.2).bold()
        );
    }
    0
}

fn run_definition(file: &Path, name: &str, as_json: bool) -> i32 {
    let Some(analysis) = load_document(file) else {
        return 1;
    };

    let entry = analysis.find_definition(name);
    if as_json {
        let value = entry.map(|entry| {
            let pos = analysis.position_at(entry.range.start);
            json!({
                "name": entry.name,
                "line": pos.line,
                "character": pos.character,
                "range": entry.range,
            })
        });
        print_json(&json!(value));
        return if value.is_some() { 0 } else { 1 };
    }

    match entry {
        Some(entry) => {
            println!(
                "{}:{}",
                file.display(),
                location(&analysis, entry.range.start).truecolor(LUMINOUS.0, LUMINOUS.1, LUMINOUS.2)
            );
            0
        }
        None => {
            eprintln!("{} '{}'", "No definition found for".bright_yellow(), name);
            1
        }
    }
}

fn run_rename(file: &Path, from: &str, to: &str, write: bool, as_json: bool) -> i32 {
    let Some(analysis) = load_document(file) else {
        return 1;
    };

    let edits = match analysis.compute_rename_edits(from, to) {
        Ok(edits) => edits,
        Err(e) => {
            print_error(&e);
            return 1;
        }
    };

    if write {
        if edits.is_empty() {
            println!("{} '{}'", "No occurrences of".truecolor(FOREST.0, FOREST.1, FOREST.2), from);
            return 0;
        }
        if let Err(e) = fs::write(file, apply_edits(analysis.text(), &edits)) {
            eprintln!("{} {}: {}", "Error writing".bright_red().bold(), file.display(), e);
            return 1;
        }
        println!(
            "{} {} occurrence(s) of '{}' to '{}'",
            "Renamed".truecolor(LUMINOUS.0, LUMINOUS.1, LUMINOUS.2).bold(),
            edits.len(),
            from,
            to
        );
        return 0;
    }

    if as_json {
        print_json(&json!(edits));
        return 0;
    }

    for edit in &edits {
        println!(
            "{}  {} -> {}",
            location(&analysis, edit.range.start).truecolor(FOREST.0, FOREST.1, FOREST.2),
            edit.range.slice(analysis.text()),
            edit.replacement.truecolor(LUMINOUS.0, LUMINOUS.1, LUMINOUS.2)
        );
    }
    0
}

fn run_complete(file: &Path, position: LineCol, as_json: bool) -> i32 {
    let Some(analysis) = load_document(file) else {
        return 1;
    };

    let candidates = analysis.completions_at(analysis.offset_at(position));
    if as_json {
        print_json(&json!(candidates));
        return 0;
    }

    for candidate in &candidates {
        println!(
            "{:<12} {:<8} {}",
            candidate.label.truecolor(LUMINOUS.0, LUMINOUS.1, LUMINOUS.2),
            format!("{:?}", candidate.kind).to_lowercase().truecolor(FOREST.0, FOREST.1, FOREST.2),
            candidate.detail
        );
    }
    0
}

fn run_context(file: &Path, position: LineCol, as_json: bool) -> i32 {
    let Some(analysis) = load_document(file) else {
        return 1;
    };

    let context = analysis.resolve_context(analysis.offset_at(position));
    if as_json {
        let value = match &context {
            BlockContext::TopLevel => json!({ "kind": "topLevel" }),
            BlockContext::InsideObject(name) => json!({ "kind": "object", "name": name }),
            BlockContext::InsideRoute => json!({ "kind": "route" }),
        };
        print_json(&value);
        return 0;
    }

    let description = match &context {
        BlockContext::TopLevel => "top level".to_string(),
        BlockContext::InsideObject(name) => format!("object {}", name),
        BlockContext::InsideRoute => "route".to_string(),
    };
    println!("{}", description.truecolor(LUMINOUS.0, LUMINOUS.1, LUMINOUS.2));
    0
}

fn run_format(file: &Path, config_path: Option<&Path>) -> i32 {
    let config = match load_config(config_path, file) {
        Ok(config) => config,
        Err(e) => {
            print_error(&e);
            return 1;
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("{} {}", "Error starting runtime:".bright_red().bold(), e);
            return 1;
        }
    };

    let formatter = ExternalFormatter::new(&config.formatter);
    match runtime.block_on(formatter.format_file(file)) {
        Ok(()) => {
            println!(
                "{} {}",
                "Formatted".truecolor(LUMINOUS.0, LUMINOUS.1, LUMINOUS.2).bold(),
                file.display()
            );
            0
        }
        Err(e) => {
            print_error(&e);
            1
        }
    }
}

fn print_error<E: miette::Diagnostic>(e: &E) {
    let mut out = String::new();
    let _ = GraphicalReportHandler::new_themed(miette::GraphicalTheme::unicode()).render_report(&mut out, e);

    eprintln!("{}", "┌─── [ ERROR ] ────────────────────────────────".truecolor(ACID.0, ACID.1, ACID.2));
    for line in out.trim_end().lines() {
        eprintln!("{} {}", "║".truecolor(ACID.0, ACID.1, ACID.2), line);
    }
    eprintln!("{}", "└──────────────────────────────────────────────".truecolor(ACID.0, ACID.1, ACID.2));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_position() {
        assert_eq!(parse_position("3:5").unwrap(), LineCol::new(2, 4));
        assert!(parse_position("0:1").is_err());
        assert!(parse_position("12").is_err());
        assert!(parse_position("a:b").is_err());
    }

    #[test]
    fn test_load_config_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("api.manyleb");
        fs::write(&file, "").unwrap();
        let config = load_config(None, &file).unwrap();
        // a manyleb-ide.json in some ancestor of the temp dir would change this
        if Config::find(dir.path()).is_none() {
            assert_eq!(config, Config::default());
        }
    }

    #[test]
    fn test_load_config_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("custom.json");
        fs::write(&config_path, r#"{ "formatter": { "command": "fmt-tool" } }"#).unwrap();
        let config = load_config(Some(&config_path), Path::new("api.manyleb")).unwrap();
        assert_eq!(config.formatter.command, "fmt-tool");
    }
}
