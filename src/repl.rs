//! Interactive console loop.
//!
//! Reads one prompt per line from stdin; the sentinel line `exit`
//! terminates the loop. Fragments are printed as they arrive, followed
//! by a newline per completed exchange. A Ctrl-C during a generation
//! cancels that exchange only; the loop keeps running. Per-exchange
//! errors are printed and contained — only the next prompt is affected.

use anyhow::Result;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::chat::ChatOrchestrator;

/// Line that terminates the loop.
pub const EXIT_SENTINEL: &str = "exit";

pub async fn run_loop(orchestrator: &mut ChatOrchestrator) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        println!("Type '{}' to exit the program", EXIT_SENTINEL);

        let Some(line) = lines.next_line().await? else {
            break; // stdin closed
        };

        let prompt = line.trim();
        if prompt == EXIT_SENTINEL {
            break;
        }
        if prompt.is_empty() {
            continue;
        }

        let cancel = CancellationToken::new();
        let interrupt = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            })
        };

        let mut on_fragment = |fragment: &str| {
            print!("{}", fragment);
            let _ = std::io::stdout().flush();
        };

        match orchestrator.ask(prompt, &cancel, &mut on_fragment).await {
            Ok(_) => println!(),
            Err(e) => {
                println!();
                eprintln!("Exchange failed: {:#}", e);
            }
        }

        interrupt.abort();
    }

    Ok(())
}
