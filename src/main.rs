use clap::{value_parser, Arg, ArgAction, Command};
use log::debug;
use ram::{runner, Config};
use std::fs;
use std::path::Path;

fn main() {
    let matches = Command::new("ram")
        .about("Interpreter for the Ram programming language")
        .arg(
            Arg::new("file")
                .help("The .ram program to execute")
                .value_name("FILE")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("max-depth")
                .long("max-depth")
                .help("Maximum number of nested function calls")
                .value_name("N")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log interpreter activity (-v debug, -vv trace)")
                .action(ArgAction::Count),
        )
        .get_matches();

    init_logging(matches.get_count("verbose"));

    let mut config = Config::default();
    if let Some(depth) = matches.get_one::<usize>("max-depth") {
        config = config.with_max_call_depth(*depth);
    }

    let status = match matches.get_one::<String>("file") {
        Some(file_path) => run_file(file_path, config),
        None => {
            eprintln!("Error: no program given, e.g. 'ram main.ram'");
            1
        }
    };
    std::process::exit(status);
}

fn init_logging(verbosity: u8) {
    let default_filter = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

/// Program files need exactly one dot and the `.ram` extension.
fn verify_file_name(path: &Path) -> Result<(), String> {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| format!("Invalid file name '{}'", path.display()))?;

    match name.matches('.').count() {
        0 => Err(format!("Invalid file name '{}', no extension specified.", name)),
        1 if name.ends_with(".ram") => Ok(()),
        1 => {
            let extension = &name[name.find('.').unwrap_or(0)..];
            Err(format!("File extension '{}' not recognised.", extension))
        }
        _ => Err(format!("Invalid file name '{}'", name)),
    }
}

fn run_file(path: &str, config: Config) -> i32 {
    let path = Path::new(path);

    if let Err(message) = verify_file_name(path) {
        eprintln!("Error: {}", message);
        return 1;
    }

    if !path.exists() {
        eprintln!("Error: File '{}' not found", path.display());
        return 1;
    }

    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", path.display(), e);
            return 1;
        }
    };

    debug!("Running '{}' with {:?}", path.display(), config);
    runner::run(&source, Some(&path.display().to_string()), &config)
}
