use std::cell::{Cell, RefCell};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;

use clap::Parser;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use ecmarun::abstract_ops::conversion::to_string;
use ecmarun::abstract_ops::create_method_property;
use ecmarun::builtins::builtin_function;
use ecmarun::engine::{ErrorKind, Message};
use ecmarun::evaluator::evaluate_script;
use ecmarun::modules::{ModuleId, evaluate, link, parse_module, top_level_module_evaluation_job};
use ecmarun::object::PropertyKey;
use ecmarun::{Agent, Completion, Feature, HostDefinedOptions, JsValue, q};

#[derive(Parser)]
#[command(name = "ecmarun", version, about = "An ECMAScript interpreter")]
struct Cli {
    /// Script or module file to execute
    file: Option<PathBuf>,

    /// Evaluate inline source text
    #[arg(short = 'e', long = "eval")]
    eval: Option<String>,

    /// Treat the input as a module
    #[arg(long)]
    module: bool,

    /// Opt-in language features
    #[arg(long, value_enum, value_delimiter = ',')]
    features: Vec<Feature>,
}

#[derive(Debug, Error)]
enum HostError {
    #[error("cannot read {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("cannot find module '{0}'")]
    ModuleNotFound(String),
}

/// Module records already loaded. A request is looked up by referrer first,
/// then by the file it resolves to, so every file is parsed once.
#[derive(Default)]
struct ModuleCache {
    by_request: FxHashMap<String, ModuleId>,
    by_path: FxHashMap<PathBuf, ModuleId>,
}

type SharedModuleCache = Rc<RefCell<ModuleCache>>;

fn read_source(path: &Path) -> Result<String, HostError> {
    std::fs::read_to_string(path).map_err(|source| HostError::Io { path: path.to_owned(), source })
}

fn module_error(source: io::Error, path: &Path, request: &str) -> HostError {
    if source.kind() == io::ErrorKind::NotFound {
        HostError::ModuleNotFound(request.to_owned())
    } else {
        HostError::Io { path: path.to_owned(), source }
    }
}

/// Resolves `request` against the directory of `referrer`, or the working
/// directory for the entry module.
fn module_path(referrer: Option<&str>, request: &str) -> PathBuf {
    let base = referrer.and_then(|r| Path::new(r).parent()).unwrap_or(Path::new("."));
    base.join(request)
}

/// Parses a module file and records it under its canonical path.
fn load_module(
    agent: &Agent,
    cache: &SharedModuleCache,
    canonical: PathBuf,
    source: &str,
    specifier: String,
) -> Completion<ModuleId> {
    info!(%specifier, "loading module");
    let id = q!(parse_module(agent, source, agent.current_realm(), Some(specifier)));
    cache.borrow_mut().by_path.insert(canonical, id);
    Completion::Normal(id)
}

fn unresolved(agent: &Agent, error: HostError, request: &str) -> Completion<ModuleId> {
    debug!(%error, "module resolution failed");
    agent.throw(ErrorKind::Error, Message::CouldNotResolveModule(request.to_owned()))
}

fn resolve_module(
    agent: &Agent,
    cache: &SharedModuleCache,
    referrer: Option<&str>,
    request: &str,
) -> Completion<ModuleId> {
    let key = format!("{}\0{request}", referrer.unwrap_or_default());
    if let Some(id) = cache.borrow().by_request.get(&key) {
        return Completion::Normal(*id);
    }
    let path = module_path(referrer, request);
    let canonical = match std::fs::canonicalize(&path) {
        Ok(canonical) => canonical,
        Err(e) => return unresolved(agent, module_error(e, &path, request), request),
    };
    let cached = cache.borrow().by_path.get(&canonical).copied();
    let id = match cached {
        Some(id) => id,
        None => {
            let source = match std::fs::read_to_string(&canonical) {
                Ok(source) => source,
                Err(e) => return unresolved(agent, module_error(e, &path, request), request),
            };
            q!(load_module(agent, cache, canonical, &source, path.to_string_lossy().into_owned()))
        }
    };
    cache.borrow_mut().by_request.insert(key, id);
    Completion::Normal(id)
}

struct Host {
    agent: Agent,
    failed: Rc<Cell<bool>>,
    modules: SharedModuleCache,
}

impl Host {
    fn new(features: &[Feature]) -> Self {
        let failed = Rc::new(Cell::new(false));
        let modules: SharedModuleCache = Rc::default();
        let cache = modules.clone();
        let mut options = HostDefinedOptions::default();
        for &feature in features {
            options = options.with_feature(feature);
        }
        let report_failed = failed.clone();
        let options = options
            .on_report_error(move |agent, error| {
                report_failed.set(true);
                eprintln!("Uncaught {}", agent.inspect(error));
            })
            .on_resolve_imported_module(move |agent, referrer, request| {
                resolve_module(agent, &cache, referrer, request)
            });
        let agent = Agent::new(options);
        let realm = agent.initialize_host_defined_realm();
        let print = builtin_function(&agent, "print", 1, |agent, _this, args, _new_target| {
            let mut line = String::new();
            for (i, value) in args.iter().enumerate() {
                if i > 0 {
                    line.push(' ');
                }
                let text = match value {
                    JsValue::String(s) => s.to_rust_string(),
                    JsValue::Symbol(_) => agent.inspect(value),
                    other => match to_string(agent, other) {
                        Completion::Normal(s) => s.to_rust_string(),
                        abrupt => return abrupt.map(|_| JsValue::Undefined),
                    },
                };
                line.push_str(&text);
            }
            println!("{line}");
            Completion::Normal(JsValue::Undefined)
        });
        create_method_property(&realm.global_object(), PropertyKey::from("print"), JsValue::Object(print));
        Host { agent, failed, modules }
    }

    fn run_script(&self, source: &str, specifier: Option<String>) -> Option<JsValue> {
        let result = evaluate_script(&self.agent, source, specifier);
        let value = match result {
            Completion::Normal(v) => Some(v),
            Completion::Throw(e) => {
                self.failed.set(true);
                eprintln!("Uncaught {}", self.agent.inspect(&e));
                None
            }
            other => {
                debug!(kind = other.kind(), "script ended abruptly");
                None
            }
        };
        self.agent.run_jobs();
        value
    }

    fn run_module(&self, source: String, specifier: String) {
        top_level_module_evaluation_job(&self.agent, source, Some(specifier));
        self.agent.run_jobs();
    }

    /// Runs an entry module file. The entry is registered with the loader, so
    /// an import cycle leading back to it reuses the same record.
    fn run_module_file(&self, path: &Path, source: String) {
        let cache = self.modules.clone();
        let specifier = path.to_string_lossy().into_owned();
        let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_owned());
        self.agent.enqueue_job("ScriptJobs", move |agent| {
            let module = q!(load_module(agent, &cache, canonical, &source, specifier));
            q!(link(agent, module));
            evaluate(agent, module).map(|()| JsValue::Undefined)
        });
        self.agent.run_jobs();
    }

    fn exit_code(&self) -> ExitCode {
        if self.failed.get() { ExitCode::from(1) } else { ExitCode::SUCCESS }
    }
}

fn run_file(host: &Host, path: &Path, module: bool) -> ExitCode {
    let source = match read_source(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    };
    if module || path.extension().is_some_and(|ext| ext == "mjs") {
        host.run_module_file(path, source);
    } else {
        host.run_script(&source, Some(path.to_string_lossy().into_owned()));
    }
    host.exit_code()
}

fn run_repl(host: &Host) -> ExitCode {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    println!("ecmarun v{}", env!("CARGO_PKG_VERSION"));
    println!("Type ECMAScript statements. Press Ctrl-D to exit.");

    loop {
        print!("> ");
        if stdout.flush().is_err() {
            break;
        }
        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if let Some(value) = host.run_script(trimmed, None) {
                    println!("{}", host.agent.inspect(&value));
                }
                host.failed.set(false);
            }
            Err(e) => {
                eprintln!("Read error: {e}");
                return ExitCode::from(1);
            }
        }
    }

    println!();
    ExitCode::SUCCESS
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env("ECMARUN_LOG").unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let host = Host::new(&cli.features);

    if let Some(code) = &cli.eval {
        if cli.module {
            host.run_module(code.clone(), "<eval>".to_owned());
        } else {
            host.run_script(code, None);
        }
        return host.exit_code();
    }

    if let Some(path) = &cli.file {
        return run_file(&host, path, cli.module);
    }

    run_repl(&host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_features_and_flags() {
        let cli = Cli::parse_from(["ecmarun", "--module", "--features", "globalThis,Promise.allSettled", "a.mjs"]);
        assert!(cli.module);
        assert_eq!(cli.features, vec![Feature::GlobalThis, Feature::PromiseAllSettled]);
        assert_eq!(cli.file.as_deref(), Some(Path::new("a.mjs")));
    }

    #[test]
    fn modules_resolve_next_to_their_referrer() {
        assert_eq!(module_path(Some("lib/main.mjs"), "./dep.mjs"), Path::new("lib/./dep.mjs"));
        assert_eq!(module_path(None, "entry.mjs"), Path::new("./entry.mjs"));
    }

    #[test]
    fn missing_modules_are_reported_as_errors() {
        let host = Host::new(&[]);
        let result = resolve_module(&host.agent, &host.modules, None, "./definitely-missing.mjs");
        assert!(matches!(result, Completion::Throw(_)));
        assert!(host.modules.borrow().by_request.is_empty());
        assert!(host.modules.borrow().by_path.is_empty());
    }

    #[test]
    fn module_files_in_a_cycle_run_once() {
        let dir = std::env::temp_dir().join(format!("ecmarun-cycle-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let files = [
            (
                "entry.mjs",
                "import { a } from './a.mjs'; import { b } from './b.mjs'; \
                 globalThis.log = (globalThis.log || []).concat('entry:' + a + b);",
            ),
            (
                "a.mjs",
                "import { b } from './b.mjs'; import './entry.mjs'; export const a = 'A'; \
                 globalThis.log = (globalThis.log || []).concat('a');",
            ),
            (
                "b.mjs",
                "import { a } from './a.mjs'; export const b = 'B'; \
                 globalThis.log = (globalThis.log || []).concat('b');",
            ),
        ];
        for (name, source) in files {
            std::fs::write(dir.join(name), source).unwrap();
        }
        let host = Host::new(&[Feature::GlobalThis]);
        let entry = dir.join("entry.mjs");
        host.run_module_file(&entry, read_source(&entry).unwrap());
        let log = host.run_script("log.join()", None).unwrap();
        assert_eq!(to_string(&host.agent, &log).unwrap_normal().to_rust_string(), "b,a,entry:AB");
        assert!(!host.failed.get());
        assert_eq!(host.modules.borrow().by_path.len(), 3);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
