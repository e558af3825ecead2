//! Minimal CLI: compile SDL or operation documents → .proto
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;

use crate::error::Diagnostic;
use crate::ledger::FieldLedger;
use crate::CompileOptions;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// compile a GraphQL schema or client operations into a gRPC service definition
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// compile SDL: one RPC per Query/Mutation/Subscription field
    Sdl(SdlOut),
    /// compile operation documents against a schema, one RPC each
    Operations(OperationsOut),
}

#[derive(Args, Debug, Clone)]
struct CompileSettings {
    /// name of the generated proto service
    #[arg(long, default_value = "DefaultService")]
    service_name: String,

    /// proto package name
    #[arg(long, default_value = "service.v1")]
    package: String,

    /// field-number ledger from a previous run; read before compiling,
    /// written back after
    #[arg(long)]
    lock: Option<PathBuf>,

    /// treat unsupported schema definitions (enums, unions, ...) as errors
    #[arg(long, default_value_t = false)]
    deny_unsupported: bool,
}

#[derive(clap::Parser, Debug)]
struct SdlOut {
    #[command(flatten)]
    compile_settings: CompileSettings,

    /// the GraphQL SDL file
    #[arg(long, short)]
    input: PathBuf,

    /// output .proto file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct OperationsOut {
    #[command(flatten)]
    compile_settings: CompileSettings,

    /// the GraphQL SDL file the operations are validated against
    #[arg(long)]
    schema: PathBuf,

    /// one or more operation documents; literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,

    /// output directory for <operation-file-stem>.proto files (stdout if omitted)
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl CompileSettings {
    fn load_options(&self) -> anyhow::Result<CompileOptions> {
        let lock = match self.lock.as_ref() {
            Some(path) if path.exists() => Some(read_ledger(path)?),
            _ => None,
        };
        Ok(CompileOptions {
            service_name: self.service_name.clone(),
            package: self.package.clone(),
            lock,
        })
    }

    fn check_diagnostics(&self, diagnostics: &[Diagnostic]) -> anyhow::Result<()> {
        for diagnostic in diagnostics {
            eprintln!("{} {diagnostic}", "warning:".yellow().bold());
        }
        if self.deny_unsupported && !diagnostics.is_empty() {
            anyhow::bail!(
                "{} unsupported definition(s) in schema (see warnings above)",
                diagnostics.len()
            );
        }
        Ok(())
    }

    fn store_ledger(&self, ledger: &FieldLedger) -> anyhow::Result<()> {
        let Some(path) = self.lock.as_ref() else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(ledger)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write ledger file {}", path.display()))?;
        Ok(())
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> anyhow::Result<()> {
        match &self.cmd {
            Command::Sdl(target) => {
                let sdl = read_source(&target.input)?;
                let options = target.compile_settings.load_options()?;
                let result = crate::compile_graphql_to_proto(&sdl, options)?;
                target
                    .compile_settings
                    .check_diagnostics(&result.diagnostics)?;

                if let Some(out) = target.out.as_ref() {
                    write_output(out, &result.proto)?;
                } else {
                    print!("{}", result.proto);
                }
                target.compile_settings.store_ledger(&result.lock)?;
            }
            Command::Operations(target) => {
                let schema = read_source(&target.schema)?;
                let source_paths = resolve_file_path_patterns(&target.input)
                    .map_err(|error| anyhow::anyhow!("failed to resolve input paths: {error}"))?;
                let settings = &target.compile_settings;

                if settings.lock.is_some() {
                    // a shared ledger needs a deterministic order, so the
                    // documents compile sequentially
                    let mut options = settings.load_options()?;
                    for source_path in &source_paths {
                        let compiled = compile_one(source_path, &schema, options.clone())?;
                        settings.check_diagnostics(&compiled.diagnostics)?;
                        emit_result(target, source_path, &compiled)?;
                        options.lock = Some(compiled.lock);
                    }
                    if let Some(ledger) = options.lock {
                        settings.store_ledger(&ledger)?;
                    }
                } else {
                    let options = settings.load_options()?;
                    let compiled: Vec<anyhow::Result<_>> = source_paths
                        .par_iter()
                        .map(|source_path| {
                            compile_one(source_path, &schema, options.clone())
                                .map(|result| (source_path, result))
                        })
                        .collect();
                    for entry in compiled {
                        let (source_path, result) = entry?;
                        settings.check_diagnostics(&result.diagnostics)?;
                        emit_result(target, source_path, &result)?;
                    }
                }
            }
        }
        Ok(())
    }
}

fn compile_one(
    source_path: &Path,
    schema: &str,
    options: CompileOptions,
) -> anyhow::Result<crate::OperationCompilation> {
    let operation = read_source(source_path)?;
    crate::compile_operations_to_proto(&operation, schema, options)
        .with_context(|| format!("failed to compile {}", source_path.display()))
}

fn emit_result(
    target: &OperationsOut,
    source_path: &Path,
    compiled: &crate::OperationCompilation,
) -> anyhow::Result<()> {
    match target.out_dir.as_ref() {
        Some(dir) => {
            let stem = source_path
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
                .unwrap_or_else(|| compiled.rpc_name.clone());
            let out = dir.join(format!("{stem}.proto"));
            write_output(&out, &compiled.proto)?;
            eprintln!(
                "{} {} -> {}",
                "compiled".green().bold(),
                compiled.rpc_name,
                out.display()
            );
        }
        None => {
            println!("// {}", source_path.display());
            print!("{}", compiled.proto);
        }
    }
    Ok(())
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn read_source(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("failed to read source file {}", path.display()))
}

fn write_output(path: &Path, content: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, content)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn read_ledger(path: &Path) -> anyhow::Result<FieldLedger> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read ledger file {}", path.display()))?;
    let mut deserializer = serde_json::Deserializer::from_str(&source);
    let ledger = serde_path_to_error::deserialize(&mut deserializer)
        .with_context(|| format!("malformed ledger file {}", path.display()))?;
    Ok(ledger)
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            // Treat as a glob pattern
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                match entry {
                    Ok(p) => {
                        matched_any = true;
                        out.push(p);
                    }
                    Err(e) => return Err(Box::new(e)),
                }
            }
            if !matched_any {
                // Pattern was explicitly a glob but matched nothing -> surface as an error
                return Err(format!("glob pattern matched no files: {pattern}").into());
            }
        } else {
            // Treat as a literal path
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
