//! Demo command set.

use serde_json::{Value, json};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tether_core::{
    BoundArgs, CommandFault, CommandHost, CommandMarker, Operation, ParamMarker, ResponseViewType,
};

/// General-purpose commands an app might expose while debugging.
#[derive(Debug)]
pub struct DemoCommands {
    app_name: String,
    slow_op_delay: Duration,
}

impl DemoCommands {
    pub fn new(app_name: impl Into<String>, slow_op_delay: Duration) -> Self {
        Self { app_name: app_name.into(), slow_op_delay }
    }

    fn info(&self) -> Value {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        json!({
            "app": self.app_name,
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": timestamp.to_string(),
            "message": "Registered through a declarative operation table",
        })
    }
}

impl CommandHost for DemoCommands {
    fn operations(&self) -> Vec<Operation<Self>> {
        vec![
            Operation::new("info")
                .command(
                    CommandMarker::new("getInfo")
                        .title("Get Info")
                        .description("Returns basic information about the app"),
                )
                .handler(|host: &Self, _: &BoundArgs| Ok::<_, CommandFault>(host.info())),
            Operation::new("echo")
                .command(
                    CommandMarker::new("echo").title("Echo").description("Echoes back a message"),
                )
                .param(ParamMarker::string("message"))
                .handler(|_: &Self, args: &BoundArgs| {
                    Ok::<_, CommandFault>(format!("Echo: {}", args.string("message")?))
                }),
            Operation::new("multiply")
                .command(
                    CommandMarker::new("multiply")
                        .title("Multiply Numbers")
                        .description("Multiplies two integers"),
                )
                .param(ParamMarker::integer("x"))
                .param(ParamMarker::integer("y"))
                .handler(|_: &Self, args: &BoundArgs| {
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
            Operation::new("sum")
                .command(
                    CommandMarker::new("sum")
                        .title("Calculate Sum")
                        .description("Adds two numbers")
                        .response_view_type(ResponseViewType::Table),
                )
                .param(ParamMarker::float("a"))
                .param(ParamMarker::float("b"))
                .handler(|_: &Self, args: &BoundArgs| {
                    let a = args.float("a")?;
                    let b = args.float("b")?;
                    Ok::<_, CommandFault>(json!([{
                        "a": a,
                        "b": b,
                        "sum": a + b,
                        "operation": "addition",
                    }]))
                }),
            Operation::new("concat")
                .command(
                    CommandMarker::new("concat")
                        .title("Concatenate Strings")
                        .description("Joins two strings with a space"),
                )
                .param(ParamMarker::string("first"))
                .param(ParamMarker::string("second"))
                .handler(|_: &Self, args: &BoundArgs| {
                    let first = args.string("first")?;
                    let second = args.string("second")?;
                    Ok::<_, CommandFault>(format!("{} {}", first, second))
                }),
            Operation::new("greet")
                .command(CommandMarker::new("greet").title("Greet User"))
                .param(ParamMarker::string("name"))
                .param(
                    ParamMarker::string("greeting")
                        .option("Hello", "Hello")
                        .option("Welcome back", "Welcome back"),
                )
                .handler(|host: &Self, args: &BoundArgs| {
                    Ok::<_, CommandFault>(format!(
                        "{}, {}! Welcome to {}.",
                        args.string("greeting")?,
                        args.string("name")?,
                        host.app_name
                    ))
                }),
            Operation::new("slow_op")
                .command(
                    CommandMarker::new("slowOp")
                        .title("Slow Operation")
                        .description("Simulates a slow asynchronous operation")
                        .response_view_type(ResponseViewType::Auto),
                )
                .async_handler(|host: Arc<Self>, _: BoundArgs| async move {
                    tokio::time::sleep(host.slow_op_delay).await;
                    Ok::<_, CommandFault>(format!(
                        "Slow operation completed after {} ms",
                        host.slow_op_delay.as_millis()
                    ))
                }),
        ]
    }
}
