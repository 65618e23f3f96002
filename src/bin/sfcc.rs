//! CLI wrapper around the SFC bridge.
//!
//! Usage:
//!   sfcc App.vue                       # parse and compile every block
//!   sfcc App.vue --stage template      # only the template
//!   sfcc App.vue --config sfc.toml -v  # custom runtime config, debug logs

use std::fs;
use std::io;
use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use tracing::Level;

use sfc_bridge::bridge::owned::{AttrValue, Block, Compiler, Descriptor, ScriptOutput};
use sfc_bridge::runner::plugin::config::RuntimeConfig;
use sfc_bridge::sfc::fnv1a;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Stage {
    Parse,
    Script,
    Template,
    Style,
    All,
}

impl Stage {
    fn runs(self, stage: Stage) -> bool {
        self == Stage::All || self == stage
    }
}

#[derive(Debug, Parser)]
#[command(name = "sfcc", version, about = "Parse and compile single-file components")]
struct Args {
    /// The `.vue` file to compile
    file: PathBuf,

    /// Scope id; defaults to a hash of the file path
    #[arg(long)]
    id: Option<String>,

    /// Production mode for compileScript and css variable names
    #[arg(long)]
    prod: bool,

    /// Scope every template and style, not only `<style scoped>`
    #[arg(long)]
    scoped: bool,

    #[arg(long, value_enum, default_value_t = Stage::All)]
    stage: Stage,

    /// Runtime configuration (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let max = if verbose { Level::TRACE } else { Level::WARN };
    let _ = tracing_subscriber::fmt()
        .with_max_level(max)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn fail(message: String) -> ! {
    eprintln!("{}", message);
    process::exit(1);
}

fn section(title: &str, body: &str) {
    println!("==== {} ====", title);
    println!("{}", body);
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = match &args.config {
        Some(path) => RuntimeConfig::load(path).unwrap_or_else(|e| fail(e.to_string())),
        None => RuntimeConfig::default(),
    };
    let bytes = fs::read(&args.file)
        .unwrap_or_else(|e| fail(format!("Error reading file '{}': {}", args.file.display(), e)));
    let source = String::from_utf8_lossy(&bytes);
    let filename = args.file.display().to_string();
    let id = args
        .id
        .clone()
        .unwrap_or_else(|| format!("{:08x}", fnv1a(&filename)));

    let compiler = Compiler::with_config(config).unwrap_or_else(|e| fail(e.to_string()));
    let errors = compile(&compiler, &args, &source, &filename, &id);
    if errors > 0 {
        fail(format!("{} error(s)", errors));
    }
}

/// Runs the requested stages and returns how many errors were reported.
fn compile(compiler: &Compiler, args: &Args, source: &str, filename: &str, id: &str) -> usize {
    let parsed = compiler
        .parse(source, filename)
        .unwrap_or_else(|e| fail(format!("{}: {}", filename, e)));
    let mut errors = 0;
    for message in parsed.errors() {
        eprintln!("{}: {}", filename, message);
        errors += 1;
    }
    let descriptor = match parsed.descriptor() {
        Some(d) => d,
        None => return errors,
    };
    if args.stage.runs(Stage::Parse) {
        section("descriptor", &summary(&descriptor));
    }

    let mut script: Option<ScriptOutput<'_>> = None;
    if args.stage.runs(Stage::Script) && (descriptor.has_script() || descriptor.has_script_setup()) {
        match descriptor.compile_script(id, args.prod) {
            Ok(out) => {
                for warning in out.warnings() {
                    eprintln!("{}: warning: {}", filename, warning);
                }
                section("script", out.content());
                script = Some(out);
            }
            Err(e) => {
                errors += 1;
                eprintln!("{}: {}", filename, e);
            }
        }
    }

    if args.stage.runs(Stage::Template) {
        if let Some(block) = descriptor.template() {
            let scoped = args.scoped || descriptor.has_scoped_style();
            match compiler.compile_template(block.content(), filename, id, scoped, script.as_ref()) {
                Ok(out) => {
                    let failed = out.errors();
                    for message in &failed {
                        eprintln!("{}: template: {}", filename, message);
                    }
                    for tip in out.tips() {
                        eprintln!("{}: tip: {}", filename, tip);
                    }
                    errors += failed.len();
                    if failed.is_empty() {
                        section("template", out.code());
                    }
                }
                Err(e) => {
                    errors += 1;
                    eprintln!("{}: {}", filename, e);
                }
            }
        }
    }

    if args.stage.runs(Stage::Style) {
        for (i, block) in descriptor.styles().enumerate() {
            let scoped = args.scoped || block.is_scoped();
            match compiler.compile_style(block.content(), filename, id, scoped) {
                Ok(out) => {
                    let failed = out.errors();
                    for message in &failed {
                        eprintln!("{}: style {}: {}", filename, i, message);
                    }
                    errors += failed.len();
                    section(&format!("style {}", i), out.code());
                }
                Err(e) => {
                    errors += 1;
                    eprintln!("{}: {}", filename, e);
                }
            }
        }
    }
    errors
}

fn summary(descriptor: &Descriptor<'_>) -> String {
    let mut out = Vec::new();
    if let Some(block) = descriptor.template() {
        out.push(block_line("template", &block));
    }
    if let Some(block) = descriptor.script() {
        out.push(block_line("script", &block));
    }
    if let Some(block) = descriptor.script_setup() {
        out.push(block_line("script setup", &block));
    }
    for block in descriptor.styles() {
        out.push(block_line("style", &block));
    }
    for block in descriptor.custom_blocks() {
        out.push(block_line(block.block_type(), &block));
    }
    let vars = descriptor.css_vars();
    if !vars.is_empty() {
        out.push(format!("css vars: {}", vars.join(", ")));
    }
    if descriptor.slotted() {
        out.push("slotted".to_string());
    }
    out.join("\n")
}

fn block_line(name: &str, block: &Block<'_>) -> String {
    let loc = block.loc();
    let mut line = format!(
        "<{}> {}:{}-{}:{}",
        name, loc.start.line, loc.start.column, loc.end.line, loc.end.column
    );
    for (key, value) in block.attrs() {
        match value {
            AttrValue::Bool(_) => line.push_str(&format!(" {}", key)),
            AttrValue::String(v) => line.push_str(&format!(" {}=\"{}\"", key, v)),
        }
    }
    line
}
