use log::info;
use posmix::config::MixConfig;
use posmix::help;
use posmix::package;
use posmix::settings::{LoggingSettings, Settings, SettingsManager, CONFIG_FILE_NAME};
use std::env;
use std::fs::File;
use std::path::Path;
use std::process;

/// File receiving log output when `[logging] file_logging = true`.
const DEBUG_LOG_FILE: &str = "posmix_debug.log";

/// Main entry point for posmix.
///
/// # Command-Line Arguments
///
/// - `posmix <base> <target> [options]`: Generate mixed configurations
/// - `posmix ci posmix_config.cfg`: Create a settings template
/// - `posmix --help [topic]`: Display help information
///
/// Exits with code 1 on any error.
fn main() {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("posmix");
    if args.len() < 2 {
        print_usage(program);
        process::exit(1);
    }

    // Check for help flags before processing commands
    check_help_flags(&args);

    if args[1] == "ci" {
        run_create_settings_template(program, args.get(2).map(String::as_str));
        return;
    }

    let settings_manager = SettingsManager::load().unwrap_or_else(|e| {
        eprintln!("Warning: failed to load settings ({}), using defaults", e);
        SettingsManager::from_settings(Settings::default())
    });
    init_logger(settings_manager.logging());
    info!(
        "posmix {} - configuration from {}",
        env!("CARGO_PKG_VERSION"),
        settings_manager.config_source()
    );

    let config = match MixConfig::from_args(&args[1..]) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage(program);
            process::exit(1);
        }
    };

    match package::setup_as_package(&config, settings_manager.settings()) {
        Ok(folders) => {
            println!("✓ Generated {} mixed configurations", folders.len());
            for folder in &folders {
                println!("  {}", folder.display());
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

/// Initializes the console or file logger from the logging settings.
fn init_logger(logging: &LoggingSettings) {
    let level = logging
        .level
        .parse::<log::LevelFilter>()
        .unwrap_or(log::LevelFilter::Info);

    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(level).format_timestamp_millis();

    if logging.file_logging {
        match File::create(DEBUG_LOG_FILE) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => {
                eprintln!(
                    "Warning: cannot create {} ({}), logging to console",
                    DEBUG_LOG_FILE, e
                );
                builder.target(env_logger::Target::Stdout);
            }
        }
    } else {
        builder.target(env_logger::Target::Stdout);
    }
    builder.init();
}

/// Check for help flags and print appropriate help
fn check_help_flags(args: &[String]) {
    let wants_help = |arg: &str| arg == "--help" || arg == "-h";

    if wants_help(&args[1]) {
        match args.get(2) {
            Some(topic) => help::print_topic(topic),
            None => help::print_global_help(),
        }
        process::exit(0);
    }

    // posmix ci --help
    if args[1] == "ci" && args.get(2).is_some_and(|arg| wants_help(arg)) {
        help::print_ci_help();
        process::exit(0);
    }

    // posmix POSCAR1 POSCAR2 ... --help
    if args[2..].iter().any(|arg| wants_help(arg)) {
        help::print_global_help();
        process::exit(0);
    }
}

/// Writes the settings template into the current directory.
fn run_create_settings_template(program: &str, file_arg: Option<&str>) {
    if file_arg != Some(CONFIG_FILE_NAME) {
        eprintln!("Error: Missing or unknown file argument");
        eprintln!("Usage:");
        eprintln!(
            "  {} ci {}   - Create settings template",
            program, CONFIG_FILE_NAME
        );
        process::exit(1);
    }

    match SettingsManager::create_template(Path::new(CONFIG_FILE_NAME)) {
        Ok(()) => {
            println!("✓ Settings template created successfully!");
            println!("  Output file: {}", CONFIG_FILE_NAME);
            println!("\nNext steps:");
            println!("  1. Review and edit the {} file", CONFIG_FILE_NAME);
            println!("  2. The settings will be automatically loaded by posmix");
        }
        Err(e) => {
            eprintln!("Error creating settings template: {}", e);
            process::exit(1);
        }
    }
}

/// Prints usage information to stderr.
fn print_usage(program_name: &str) {
    eprintln!("posmix - Mixed configurations between two POSCAR structures");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {} <base> <target> [options]", program_name);
    eprintln!("                    Write one POSCAR per fraction into eta=<fraction> folders");
    eprintln!();
    eprintln!("  {} ci {}", program_name, CONFIG_FILE_NAME);
    eprintln!("                    Create a settings template file");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {} POSCAR1 POSCAR2 --middle 9 --incar INCAR --kpoints KPOINTS", program_name);
    eprintln!("  {} POSCAR1 POSCAR2 --eta 0.25,0.5,0.75 --output runs", program_name);
    eprintln!();
    eprintln!("Run '{} --help' for all options.", program_name);
}
