//! Integration tests for the globals CLI.
//!
//! Commands run against a temporary redb database through the same `run`
//! entry point the binary uses.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use clap::Parser;
use globals::cli::{Cli, Commands, Context, resolve_settings, run};
use globals::config::Settings;
use globals_core::{GlobalsError, Store};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

struct Fixture {
    temp: TempDir,
    store: Store,
    settings: Settings,
}

impl Fixture {
    fn new() -> Self {
        let temp = tempfile::tempdir().unwrap();
        let settings = Settings {
            database: temp.path().join("cli.redb"),
            backend: "redb".to_string(),
            lock_timeout: Duration::from_millis(100),
        };
        let store = Store::open(&settings.backend, &settings.database).unwrap();
        Self {
            temp,
            store,
            settings,
        }
    }

    fn dir(&self) -> &Path {
        self.temp.path()
    }

    fn ctx(&self, json_mode: bool) -> Context<'_> {
        Context {
            store: &self.store,
            settings: &self.settings,
            json_mode,
            quiet: false,
        }
    }

    fn run(&self, command: Commands) -> Result<String, GlobalsError> {
        run(&self.ctx(false), command)
    }

    fn run_json(&self, command: Commands) -> serde_json::Value {
        let out = run(&self.ctx(true), command).unwrap();
        serde_json::from_str(&out).unwrap()
    }

    fn set(&self, reference: &str, value: &str) {
        self.run(Commands::Set {
            reference: reference.to_string(),
            value: value.to_string(),
        })
        .unwrap();
    }
}

fn get(reference: &str) -> Commands {
    Commands::Get {
        reference: reference.to_string(),
    }
}

// =============================================================================
// ARGUMENT PARSING
// =============================================================================

#[test]
fn parses_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "globals",
        "get",
        "^patient(\"123\")",
        "--backend",
        "memory",
        "--json-mode",
    ])
    .unwrap();
    assert_eq!(cli.backend.as_deref(), Some("memory"));
    assert!(cli.json_mode);
    assert!(matches!(cli.command, Some(Commands::Get { .. })));
}

#[test]
fn config_file_supplies_defaults() {
    let temp = tempfile::tempdir().unwrap();
    let config = temp.path().join("globals.toml");
    std::fs::write(&config, "backend = \"memory\"\nlock_timeout_ms = 42\n").unwrap();

    let cli = Cli::try_parse_from([
        "globals",
        "--config",
        config.to_str().unwrap(),
        "--lock-timeout-ms",
        "7",
        "status",
    ])
    .unwrap();
    let settings = resolve_settings(&cli).unwrap();
    assert_eq!(settings.backend, "memory");
    assert_eq!(settings.lock_timeout, Duration::from_millis(7));
}

#[test]
fn missing_config_file_is_an_error() {
    let cli = Cli::try_parse_from(["globals", "--config", "/nonexistent/globals.toml"]).unwrap();
    assert!(matches!(
        resolve_settings(&cli),
        Err(GlobalsError::IoError(_))
    ));
}

// =============================================================================
// VALUE COMMANDS
// =============================================================================

#[test]
fn set_then_get() {
    let fx = Fixture::new();
    fx.set("^patient(\"123\",\"name\")", "Jane Doe");
    assert_eq!(fx.run(get("^patient(\"123\",\"name\")")).unwrap(), "Jane Doe");

    // Unquoted canonical numbers address the same node.
    assert_eq!(fx.run(get("^patient(123,\"name\")")).unwrap(), "Jane Doe");
}

#[test]
fn get_undefined_fails() {
    let fx = Fixture::new();
    assert!(matches!(
        fx.run(get("^nobody(\"1\")")),
        Err(GlobalsError::UndefinedKey { .. })
    ));
}

#[test]
fn bad_reference_is_rejected() {
    let fx = Fixture::new();
    assert!(matches!(
        fx.run(get("^patient(\"unterminated")),
        Err(GlobalsError::ParseError(_))
    ));
    assert!(fx.run(get("no_caret(")).is_err());
}

#[test]
fn delete_keeps_children_kill_does_not() {
    let fx = Fixture::new();
    fx.set("^p(1)", "v");
    fx.set("^p(1,\"a\")", "child");

    fx.run(Commands::Delete {
        reference: "^p(1)".to_string(),
    })
    .unwrap();
    assert_eq!(
        fx.run(Commands::Data {
            reference: "^p(1)".to_string()
        })
        .unwrap(),
        "10"
    );

    fx.run(Commands::Kill {
        reference: "^p(1)".to_string(),
    })
    .unwrap();
    assert_eq!(
        fx.run(Commands::Data {
            reference: "^p(1)".to_string()
        })
        .unwrap(),
        "0"
    );
}

#[test]
fn quiet_suppresses_confirmation() {
    let fx = Fixture::new();
    let ctx = Context {
        quiet: true,
        ..fx.ctx(false)
    };
    let out = run(
        &ctx,
        Commands::Set {
            reference: "^q".to_string(),
            value: "1".to_string(),
        },
    )
    .unwrap();
    assert!(out.is_empty());
}

#[test]
fn set_times_out_on_lock_held_elsewhere() {
    let fx = Fixture::new();
    let node = globals_core::Node::new(&fx.store, "^busy", ["1"]).unwrap();

    std::thread::scope(|scope| {
        let _held = node.lock(Duration::ZERO).unwrap();
        let result = scope
            .spawn(|| {
                fx.run(Commands::Set {
                    reference: "^busy(1,2)".to_string(),
                    value: "x".to_string(),
                })
            })
            .join()
            .unwrap();
        assert!(matches!(result, Err(GlobalsError::LockTimeout { .. })));
    });
}

// =============================================================================
// INSPECTION COMMANDS
// =============================================================================

#[test]
fn children_and_count() {
    let fx = Fixture::new();
    fx.set("^patient(\"123\",\"name\")", "Jane Doe");
    fx.set("^patient(\"123\",\"dob\")", "1980-02-01");
    fx.set("^patient(\"124\",\"name\")", "John Roe");

    let listed = fx
        .run(Commands::Children {
            reference: "^patient(\"123\")".to_string(),
        })
        .unwrap();
    assert_eq!(
        listed,
        "^patient(\"123\",\"dob\")\n^patient(\"123\",\"name\")"
    );

    let count = fx.run_json(Commands::Count {
        reference: "^patient".to_string(),
    });
    assert_eq!(count["count"], 3);
}

#[test]
fn subscripts_include_children_without_values() {
    let fx = Fixture::new();
    fx.set("^patient(\"123\",\"name\")", "Jane Doe");
    fx.set("^patient(\"9\",\"name\")", "John Roe");

    let subs = fx.run_json(Commands::Subscripts {
        reference: "^patient".to_string(),
    });
    assert_eq!(subs, serde_json::json!(["9", "123"]));
}

#[test]
fn status_lists_globals() {
    let fx = Fixture::new();
    fx.set("^a", "1");
    fx.set("^b(1)", "2");

    let status = fx.run_json(Commands::Status);
    assert_eq!(status["backend"], "redb");
    assert_eq!(status["node_count"], 2);
    assert_eq!(status["globals"], serde_json::json!(["^a", "^b"]));
}

// =============================================================================
// DUMP, LOAD, EXPORT, IMPORT
// =============================================================================

#[test]
fn zwrite_then_load_into_fresh_store() {
    let fx = Fixture::new();
    fx.set("^z", "top");
    fx.set("^z(1,\"say \"\"hi\"\"\")", "quoted");
    fx.set("^z(2)", "");

    let dump = fx
        .run(Commands::Zwrite {
            reference: "^z".to_string(),
        })
        .unwrap();
    assert_eq!(
        dump,
        "^z=\"top\"\n^z(\"1\",\"say \"\"hi\"\"\")=\"quoted\"\n^z(\"2\")=\"\""
    );

    let file = fx.dir().join("dump.zwr");
    std::fs::write(&file, &dump).unwrap();

    let other = Fixture::new();
    let loaded = other.run_json(Commands::Load { input: file });
    assert_eq!(loaded["loaded"], 3);
    assert_eq!(other.run(get("^z(1,\"say \"\"hi\"\"\")")).unwrap(), "quoted");
}

#[test]
fn export_then_import_under_new_reference() {
    let fx = Fixture::new();
    fx.set("^src(\"x\")", "root value");
    fx.set("^src(\"x\",\"a\")", "1");
    fx.set("^src(\"x\",\"b\",\"c\")", "2");

    let snapshot = fx.dir().join("x.snap");
    fx.run(Commands::Export {
        reference: "^src(\"x\")".to_string(),
        output: snapshot.clone(),
    })
    .unwrap();

    let imported = fx.run_json(Commands::Import {
        reference: "^dst(9)".to_string(),
        input: snapshot,
    });
    assert_eq!(imported["imported"], 3);
    assert_eq!(fx.run(get("^dst(9)")).unwrap(), "root value");
    assert_eq!(fx.run(get("^dst(9,\"b\",\"c\")")).unwrap(), "2");
}

#[test]
fn import_rejects_garbage() {
    let fx = Fixture::new();
    let file = fx.dir().join("garbage.snap");
    std::fs::write(&file, b"not a snapshot").unwrap();

    let result = fx.run(Commands::Import {
        reference: "^dst".to_string(),
        input: file,
    });
    assert!(result.is_err());
    assert_eq!(fx.store.node_count().unwrap(), 0);
}

#[test]
fn load_missing_file_fails() {
    let fx = Fixture::new();
    assert!(matches!(
        fx.run(Commands::Load {
            input: fx.dir().join("absent.zwr"),
        }),
        Err(GlobalsError::IoError(_))
    ));
}
