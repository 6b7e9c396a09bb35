use std::{
    collections::BTreeMap,
    env, fs,
    io::Write,
    path::{Path, PathBuf},
};

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use munge_lang::{error::MungeResult, Munger};

fn main() {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let command = &args[1];
    let result = match command.as_str() {
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        "version" | "--version" | "-v" => {
            print_version();
            Ok(())
        }
        "run" => {
            if args.len() < 4 {
                eprintln!("Error: 'run' command requires a script and an HTML file or directory");
                eprintln!("Usage: munge run <script.munge> <page.html|dir>");
                std::process::exit(1);
            }
            run_command(&args[2], &args[3])
        }
        "check" => {
            if args.len() < 3 {
                eprintln!("Error: 'check' command requires a file argument");
                eprintln!("Usage: munge check <script.munge>");
                std::process::exit(1);
            }
            if !check_command(&args[2]) {
                std::process::exit(1);
            }
            Ok(())
        }
        "fmt" | "format" => {
            if args.len() < 3 {
                eprintln!("Error: 'fmt' command requires a file argument");
                eprintln!("Usage: munge fmt <script.munge> [--write]");
                std::process::exit(1);
            }
            let write = args.contains(&"--write".to_string()) || args.contains(&"-w".to_string());
            format_command(&args[2], write)
        }
        _ => {
            eprintln!("Error: Unknown command '{}'", command);
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Log filtering comes from `MUNGE_LOG`, defaulting to warnings only.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("MUNGE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_usage() {
    eprintln!("munge - extract named values from HTML documents");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  munge run <script> <page.html>   Run a script against one document");
    eprintln!("  munge run <script> <dir>         Run a script against every .html file in dir");
    eprintln!("  munge check <script>             Parse a script and report errors");
    eprintln!("  munge fmt <script>               Print the script in canonical form");
    eprintln!("  munge fmt <script> -w            Rewrite the script in canonical form");
    eprintln!("  munge help                       Show this help message");
    eprintln!("  munge version                    Show version information");
    eprintln!();
    eprintln!("Set MUNGE_LOG (e.g. MUNGE_LOG=debug) to control log output.");
}

fn print_version() {
    println!("munge {}", env!("CARGO_PKG_VERSION"));
}

fn load_script(file: &str) -> MungeResult<Munger> {
    let source = fs::read_to_string(file)?;
    let munger = Munger::new(&source)?;
    debug!(
        script = file,
        statements = munger.program().statements.len(),
        "loaded script"
    );
    Ok(munger)
}

fn is_html(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|s| s.to_str()),
        Some("html") | Some("htm")
    )
}

fn html_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(error = %err, "skipping unreadable entry");
                None
            }
        })
        .map(|entry| entry.into_path())
        .filter(|path| path.is_file() && is_html(path))
        .collect()
}

fn run_command(script: &str, target: &str) -> MungeResult<()> {
    let munger = load_script(script)?;
    let target_path = Path::new(target);

    let output = if target_path.is_dir() {
        let mut documents = BTreeMap::new();
        for path in html_files(target_path) {
            info!(document = %path.display(), "munging");
            let html = fs::read_to_string(&path)?;
            documents.insert(path.display().to_string(), munger.munge(&html)?);
        }

        if documents.is_empty() {
            eprintln!("No .html files found in {}", target_path.display());
        }
        serde_json::to_string_pretty(&documents)?
    } else {
        let html = fs::read_to_string(target_path)?;
        serde_json::to_string_pretty(&munger.munge(&html)?)?
    };

    println!("{}", output);
    Ok(())
}

fn check_command(file: &str) -> bool {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);

    match load_script(file) {
        Ok(_) => {
            let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)));
            let _ = write!(stdout, "✓ ok ");
            let _ = stdout.reset();
            let _ = writeln!(stdout, "{}", file);
            true
        }
        Err(err) => {
            let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Red)));
            let _ = write!(stdout, "! ");
            let _ = stdout.reset();
            let _ = writeln!(stdout, "{}", file);
            let _ = writeln!(stdout, "  {}", err);
            false
        }
    }
}

fn format_command(file: &str, write: bool) -> MungeResult<()> {
    let munger = load_script(file)?;
    let formatted = munger.program().to_string();

    if write {
        fs::write(file, formatted)?;
        println!("Formatted: {}", file);
    } else {
        print!("{}", formatted);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_files_walks_nested_directories() -> MungeResult<()> {
        let root = env::temp_dir().join(format!("munge-html-files-{}", std::process::id()));
        fs::create_dir_all(root.join("nested"))?;
        fs::write(root.join("a.html"), "<p>a</p>")?;
        fs::write(root.join("notes.txt"), "not html")?;
        fs::write(root.join("nested").join("b.htm"), "<p>b</p>")?;

        let found = html_files(&root);
        fs::remove_dir_all(&root)?;

        assert_eq!(found, vec![root.join("a.html"), root.join("nested").join("b.htm")]);
        Ok(())
    }

    #[test]
    fn unreadable_roots_yield_no_files() {
        let missing = env::temp_dir().join(format!("munge-missing-{}", std::process::id()));
        assert!(html_files(&missing).is_empty());
    }
}
