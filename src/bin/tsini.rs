//! Command-line interface for tsini
//! Parses a TunerStudio INI file and prints it in one of the processor formats, or
//! generates the print-page source from it.
//!
//! Usage:
//!   tsini `<path>` [--format `<format>`] [--config `<file>`] [--set key=value]... [--output `<file>`] [--verbose]
//!   tsini --list-formats

use clap::{Arg, ArgAction, ArgMatches, Command};
use std::fs;
use std::process;
use tsini::tsini::codegen::PrintPageOptions;
use tsini::tsini::document::{Document, DuplicateSections};
use tsini::tsini::processor::{self, ProcessOptions, ProcessingSpec, ProcessingStage};
use tsini::tsini::reader::{DocumentReader, ParseOptions};
use tsini_config::{Loader, TsiniConfig};

fn main() {
    let matches = Command::new("tsini")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A tool for inspecting TunerStudio INI files and generating code from them")
        .arg_required_else_help(true)
        .arg(
            Arg::new("path")
                .help("Path to the INI file")
                .required_unless_present("list-formats")
                .index(1),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .short('f')
                .help("Output format (see --list-formats)")
                .default_value("document-simple"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("TOML configuration file layered over the defaults"),
        )
        .arg(
            Arg::new("set")
                .long("set")
                .help("Override a configuration key, e.g. codegen.output_var=Serial")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .help("Write the result to this file instead of stdout"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Print a per-section summary to stderr")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("list-formats")
                .long("list-formats")
                .help("List available output formats")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    if matches.get_flag("list-formats") {
        handle_list_formats_command();
        return;
    }

    let config = load_config(&matches);
    let path = matches
        .get_one::<String>("path")
        .map(String::as_str)
        .unwrap_or_default();
    let format = matches
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or_default();
    handle_process_command(
        path,
        format,
        &config,
        matches.get_one::<String>("output").map(String::as_str),
        matches.get_flag("verbose"),
    );
}

fn load_config(matches: &ArgMatches) -> TsiniConfig {
    let mut loader = Loader::new();
    if let Some(path) = matches.get_one::<String>("config") {
        loader = loader.with_file(path);
    }
    for assignment in matches.get_many::<String>("set").into_iter().flatten() {
        loader = loader.set_assignment(assignment).unwrap_or_else(|e| {
            eprintln!("Invalid --set '{}': {}", assignment, e);
            process::exit(1);
        });
    }
    loader.build().unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        process::exit(1);
    })
}

fn process_options(config: &TsiniConfig) -> ProcessOptions {
    let duplicate_sections = match config.parser.duplicate_sections {
        tsini_config::DuplicateSections::Replace => DuplicateSections::Replace,
        tsini_config::DuplicateSections::Append => DuplicateSections::Append,
    };
    ProcessOptions {
        parse: ParseOptions { duplicate_sections },
        print_page: PrintPageOptions {
            output_var: config.codegen.output_var.clone(),
            page_struct_prefix: config.codegen.page_struct_prefix.clone(),
            constants_section: config.codegen.constants_section.clone(),
            tables_section: config.codegen.tables_section.clone(),
        },
    }
}

/// Handle the process command
fn handle_process_command(path: &str, format: &str, config: &TsiniConfig, output: Option<&str>, verbose: bool) {
    let spec = ProcessingSpec::from_string(format).unwrap_or_else(|e| {
        eprintln!("{}", e);
        eprintln!("\nAvailable formats:");
        for name in processor::available_formats() {
            eprintln!("  {}", name);
        }
        process::exit(1);
    });

    let options = process_options(config);
    let reader = DocumentReader::from_path(path).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        process::exit(1);
    });

    let result = match spec.stage {
        ProcessingStage::Lines => processor::process(&reader, &spec, &options),
        ProcessingStage::Document | ProcessingStage::PrintPage => {
            let document = reader.parse_with(&options.parse).unwrap_or_else(|e| {
                eprintln!("Parse error: {}", e);
                process::exit(1);
            });
            if verbose {
                print_summary(path, &document);
            }
            processor::render(&document, &spec, &options)
        }
    }
    .unwrap_or_else(|e| {
        eprintln!("Processing error: {}", e);
        process::exit(1);
    });

    match output {
        Some(out_path) => {
            if let Err(e) = fs::write(out_path, &result) {
                eprintln!("Error writing '{}': {}", out_path, e);
                process::exit(1);
            }
            if verbose {
                eprintln!("Wrote {} bytes to {}", result.len(), out_path);
            }
        }
        None => print!("{}", result),
    }
}

fn print_summary(path: &str, document: &Document) {
    eprintln!("{}: {} sections", path, document.len());
    for section in document.sections() {
        eprintln!("  [{}] {} entries", section.name, section.entries.len());
    }
}

/// Handle the list-formats command
fn handle_list_formats_command() {
    println!("Available output formats:\n");
    for name in processor::available_formats() {
        println!("  {}", name);
    }
}
