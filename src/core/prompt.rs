use std::io::{self, BufRead, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::runtime::{Builder, Runtime};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::{self, Instant};
use tracing::debug;

/// Outcome of a timed read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Line(String),
    TimedOut,
    /// The input ended (EOF on stdin).
    Closed,
}

/// Lines typed by the user, delivered over a channel.
pub struct InputLines {
    rx: UnboundedReceiver<String>,
}

impl InputLines {
    /// Spawns a reader thread that owns stdin and forwards it line by line.
    pub fn stdin() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        std::thread::spawn(move || forward_lines(std::io::stdin().lock(), tx));
        Self::from_receiver(rx)
    }

    pub fn from_receiver(rx: UnboundedReceiver<String>) -> Self {
        Self { rx }
    }

    /// Throws away lines typed while no prompt was waiting.
    fn drain_stale(&mut self) -> usize {
        let mut stale = 0;
        while self.rx.try_recv().is_ok() {
            stale += 1;
        }
        stale
    }

    async fn next(&mut self) -> Option<String> {
        self.rx.recv().await.map(|line| line.trim().to_string())
    }
}

fn forward_lines(reader: impl BufRead, tx: UnboundedSender<String>) {
    for line in reader.lines() {
        let Ok(line) = line else {
            break;
        };
        if tx.send(line).is_err() {
            break;
        }
    }
}

/// Waits for the next line or the deadline, whichever comes first. The
/// losing wait is dropped. `on_tick` gets the whole seconds left, once a second.
pub async fn read_line_before(
    input: &mut InputLines,
    deadline: Instant,
    mut on_tick: impl FnMut(u64),
) -> Answer {
    let expiry = time::sleep_until(deadline);
    tokio::pin!(expiry);

    let second = Duration::from_secs(1);
    let mut ticker = time::interval_at(Instant::now() + second, second);

    loop {
        tokio::select! {
            biased;
            line = input.next() => {
                return match line {
                    Some(line) => Answer::Line(line),
                    None => Answer::Closed,
                };
            }
            _ = &mut expiry => return Answer::TimedOut,
            tick = ticker.tick() => on_tick(seconds_left(deadline, tick)),
        }
    }
}

fn seconds_left(deadline: Instant, now: Instant) -> u64 {
    let left = deadline.saturating_duration_since(now);
    left.as_secs() + u64::from(left.subsec_nanos() > 0)
}

fn print_tick(left: u64) {
    print_inline(&format!("{}... ", left));
}

/// Prints `text` without a newline and flushes it so it shows before input.
pub fn print_inline(text: &str) {
    if let Err(e) = write_inline(&mut io::stdout(), text) {
        debug!("Could not write to stdout: {}", e);
    }
}

fn write_inline(out: &mut impl Write, text: &str) -> io::Result<()> {
    out.write_all(text.as_bytes())?;
    out.flush()
}

/// Owns the input channel and the small runtime the countdown runs on.
pub struct Prompter {
    runtime: Runtime,
    input: InputLines,
    timeout: Duration,
    countdowns: usize,
}

impl Prompter {
    pub fn new(input: InputLines, timeout: Duration) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_time()
            .build()
            .context("could not start the prompt runtime")?;
        Ok(Self::with_runtime(runtime, input, timeout))
    }

    pub fn with_runtime(runtime: Runtime, input: InputLines, timeout: Duration) -> Self {
        Self {
            runtime,
            input,
            timeout,
            countdowns: 0,
        }
    }

    /// Starts a countdown and returns its deadline.
    pub fn start_countdown(&mut self) -> Instant {
        let stale = self.input.drain_stale();
        if stale > 0 {
            debug!("Discarded {} line(s) typed before the prompt", stale);
        }
        self.countdowns += 1;
        let timeout = self.timeout;
        debug!("Countdown {} started ({}s)", self.countdowns, timeout.as_secs());
        self.runtime.block_on(async move { Instant::now() + timeout })
    }

    pub fn seconds_left(&self, deadline: Instant) -> u64 {
        self.runtime
            .block_on(async move { seconds_left(deadline, Instant::now()) })
    }

    /// Reads one line, giving up at `deadline`.
    pub fn read_before(&mut self, deadline: Instant) -> Answer {
        self.runtime
            .block_on(read_line_before(&mut self.input, deadline, print_tick))
    }

    /// Reads one line with no time limit. `None` once the input is closed.
    pub fn read_line(&mut self) -> Option<String> {
        self.runtime.block_on(self.input.next())
    }

    #[cfg(test)]
    pub fn countdowns(&self) -> usize {
        self.countdowns
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;

    /// A prompter on a paused clock that "types" one scripted line every
    /// 100ms. The channel stays open afterwards, so an exhausted script
    /// runs into the countdown instead of closing the input.
    pub fn scripted(lines: &[&str]) -> Prompter {
        let (tx, rx) = mpsc::unbounded_channel();
        let runtime = Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .unwrap();

        let lines: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
        runtime.spawn(async move {
            for line in lines {
                time::sleep(Duration::from_millis(100)).await;
                if tx.send(line).is_err() {
                    return;
                }
            }
            std::future::pending::<()>().await;
        });

        Prompter::with_runtime(runtime, InputLines::from_receiver(rx), Duration::from_secs(10))
    }
}
