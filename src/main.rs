// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use subpipe::backends::memory::MemorySubscription;
use subpipe::config::{load_and_validate_config, PipelineConfig};
use subpipe::observability::logging;
use subpipe::{Message, PipelineParams, SubscriberPipeline};

const USAGE: &str = "Usage: subpipe [--config <file>] [<input-file>]";

/// One input line: `{"group": "...", "value": 1.5}`.
#[derive(Debug, Deserialize)]
struct Reading {
    group: String,
    value: f64,
}

/// Per-group aggregate of one batch.
#[derive(Debug, Default, Serialize)]
struct GroupTotal {
    count: u64,
    sum: f64,
}

struct Args {
    config: Option<PathBuf>,
    input: Option<PathBuf>,
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut config = None;
    let mut input = None;
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = iter.next().ok_or("--config needs a file argument")?;
                config = Some(PathBuf::from(path));
            }
            "--help" | "-h" => return Err(USAGE.to_string()),
            flag if flag.starts_with('-') => return Err(format!("unknown option: {}", flag)),
            path if input.is_none() => input = Some(PathBuf::from(path)),
            extra => return Err(format!("unexpected argument: {}", extra)),
        }
    }

    Ok(Args { config, input })
}

/// Push every non-blank line of `reader` into the subscription until the
/// input ends, the pipeline stops listening, or `token` fires.
async fn feed<R>(
    reader: R,
    sender: mpsc::Sender<Message>,
    token: CancellationToken,
) -> anyhow::Result<u64>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut fed = 0;

    loop {
        let line = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            line = lines.next_line() => match line? {
                Some(line) => line,
                None => break,
            },
        };
        if line.trim().is_empty() {
            continue;
        }
        fed += 1;
        let message = Message::new(line).with_attribute("line", fed.to_string());
        if sender.send(message).await.is_err() {
            break;
        }
    }

    Ok(fed)
}

fn accumulate(
    mut totals: BTreeMap<String, GroupTotal>,
    reading: Reading,
    _index: usize,
) -> anyhow::Result<BTreeMap<String, GroupTotal>> {
    anyhow::ensure!(
        reading.value.is_finite(),
        "value for group {} is not a finite number",
        reading.group
    );
    let total = totals.entry(reading.group).or_default();
    total.count += 1;
    total.sum += reading.value;
    Ok(totals)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let args = match parse_args(&args) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}", message);
            if message != USAGE {
                eprintln!("{}", USAGE);
            }
            std::process::exit(1);
        }
    };

    let config = match &args.config {
        Some(path) => load_and_validate_config(path)?,
        None => PipelineConfig::default(),
    };
    logging::init(&config.logging)?;

    let token = CancellationToken::new();
    tokio::spawn({
        let token = token.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupt received, cancelling pipeline");
                token.cancel();
            }
        }
    });

    let (sender, subscription) = MemorySubscription::channel(config.get_channel_capacity());
    let feeder = match &args.input {
        Some(path) => {
            let file = tokio::fs::File::open(path).await?;
            tokio::spawn(feed(BufReader::new(file), sender, token.clone()))
        }
        None => tokio::spawn(feed(BufReader::new(tokio::io::stdin()), sender, token.clone())),
    };

    let params = PipelineParams::new(Arc::new(subscription)).with_config(config);
    let (mut output, mut errors, handle) = SubscriberPipeline::new(params)?
        .map(|msg: Message| Ok(msg.decode_json::<Reading>()?))
        .batch_from_config()
        .reduce(accumulate, BTreeMap::new)
        .run(token.clone())
        .into_parts();

    let error_drain = tokio::spawn(async move {
        let mut failed = 0u64;
        while let Some(error) = errors.recv().await {
            tracing::warn!(stage = error.stage(), error = %error, "Input rejected");
            failed += 1;
        }
        failed
    });

    while let Some(totals) = output.recv().await {
        println!("{}", serde_json::to_string(&totals)?);
    }

    let dropped = handle.dropped_errors();
    handle.join().await?;
    let failed = error_drain.await?;

    if token.is_cancelled() {
        feeder.abort();
    } else {
        let fed = feeder.await??;
        tracing::info!(fed, failed, dropped, "Input exhausted");
    }

    Ok(())
}
