//! Shared hosts and helpers for tether-core integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::json;
use tether_core::{
    BoundArgs, CommandBridge, CommandFault, CommandHost, CommandMarker, CommandRegistry,
    LifecycleChange, Operation, ParamMarker, ResponseViewType,
};

/// Installs a test subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Host mirroring a typical set of debug commands.
#[derive(Default)]
pub struct SampleCommands {
    pub calls: AtomicUsize,
}

impl SampleCommands {
    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl CommandHost for SampleCommands {
    fn operations(&self) -> Vec<Operation<Self>> {
        vec![
            Operation::new("get_info")
                .command(
                    CommandMarker::new("getInfo")
                        .title("Get Info")
                        .description("Basic application info")
                        .response_view_type(ResponseViewType::Table),
                )
                .handler(|host: &Self, _: &BoundArgs| {
                    host.touch();
                    Ok::<_, CommandFault>(json!([{"name": "sample", "version": "1.0"}]))
                }),
            Operation::new("echo")
                .command(CommandMarker::new("echo").title("Echo"))
                .param(ParamMarker::string("message"))
                .handler(|host: &Self, args: &BoundArgs| {
                    host.touch();
                    Ok::<_, CommandFault>(args.string("message")?.to_string())
                }),
            Operation::new("multiply")
                .command(CommandMarker::new("multiply").title("Multiply Numbers"))
                .param(ParamMarker::integer("x"))
                .param(ParamMarker::integer("y"))
                .handler(|host: &Self, args: &BoundArgs| {
                    host.touch();
                    let x = args.integer("x")?;
                    let y = args.integer("y")?;
                    let product = x
                        .checked_mul(y)
                        .ok_or_else(|| CommandFault::arithmetic("product overflows"))?;
                    Ok::<_, CommandFault>(json!({
                        "x": x,
                        "y": y,
                        "product": product,
                        "operation": "multiplication",
                    }))
                }),
            Operation::new("concat")
                .command(CommandMarker::new("concat").title("Concatenate"))
                .param(ParamMarker::string("first"))
                .param(ParamMarker::string("second"))
                .param(ParamMarker::string("separator"))
                .handler(|host: &Self, args: &BoundArgs| {
                    host.touch();
                    Ok::<_, CommandFault>(format!(
                        "{}{}{}",
                        args.string("first")?,
                        args.string("separator")?,
                        args.string("second")?
                    ))
                }),
            Operation::new("slow_op")
                .command(CommandMarker::new("slowOp"))
                .param(ParamMarker::integer("millis"))
                .async_handler(|host: Arc<Self>, args: BoundArgs| async move {
                    let millis = u64::try_from(args.integer("millis")?)
                        .map_err(|_| CommandFault::invalid_state("millis must not be negative"))?;
                    tokio::time::sleep(Duration::from_millis(millis)).await;
                    host.touch();
                    Ok::<_, CommandFault>(json!({"slept": millis}))
                }),
        ]
    }
}

/// Host declaring `valid` good commands and `invalid` malformed ones.
pub struct MixedHost {
    pub valid: usize,
    pub invalid: usize,
}

impl CommandHost for MixedHost {
    fn operations(&self) -> Vec<Operation<Self>> {
        let good = (0..self.valid).map(|i| {
            Operation::new(format!("good_{i}"))
                .command(CommandMarker::new(format!("good{i}")))
                .param(ParamMarker::integer("n"))
                .handler(|_: &Self, args: &BoundArgs| args.integer("n"))
        });
        let bad = (0..self.invalid).map(|i| {
            Operation::new(format!("bad_{i}"))
                .command(CommandMarker::new(format!("bad{i}")))
                .unmarked_input("context")
                .handler(|_: &Self, _: &BoundArgs| Ok::<_, CommandFault>(()))
        });
        let plain = std::iter::once(Operation::new("helper"));
        good.chain(bad).chain(plain).collect()
    }
}

/// Host whose commands fail in different ways.
pub struct FaultyCommands;

impl CommandHost for FaultyCommands {
    fn operations(&self) -> Vec<Operation<Self>> {
        vec![
            Operation::new("panic_now")
                .command(CommandMarker::new("panicNow"))
                .handler(|_: &Self, _: &BoundArgs| -> Result<(), CommandFault> {
                    panic!("handler exploded")
                }),
            Operation::new("io_failure")
                .command(CommandMarker::new("ioFailure"))
                .handler(|_: &Self, _: &BoundArgs| -> Result<(), CommandFault> {
                    let err =
                        std::io::Error::new(std::io::ErrorKind::PermissionDenied, "no access");
                    Err(err.into())
                }),
            Operation::new("anyhow_failure")
                .command(CommandMarker::new("anyhowFailure"))
                .handler(|_: &Self, _: &BoundArgs| -> anyhow::Result<()> {
                    anyhow::bail!("context missing")
                }),
        ]
    }
}

/// A bridge with a fresh registry and a registered sample host.
pub async fn sample_bridge() -> (CommandBridge, Arc<SampleCommands>) {
    init_tracing();
    let bridge = CommandBridge::new(Arc::new(CommandRegistry::new()));
    let host = Arc::new(SampleCommands::default());
    bridge
        .on_host_lifecycle_change(&host, LifecycleChange::Added)
        .await
        .expect("sample host registers");
    (bridge, host)
}
