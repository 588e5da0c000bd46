use comfy_table::{Cell, Table};
use tracing::info;

use crate::core::prompt::{print_inline, Answer, Prompter};
use crate::error::SelectionError;
use crate::models::{ProviderResult, UNKNOWN};

/// What the user typed at the selection prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Zero-based index into the shown candidates.
    Candidate(usize),
    /// `0`: a metadata link or new query follows.
    Lookup,
    /// `00`: keep the video's own metadata.
    Fallback,
}

/// `"00"` is checked before the numeric parse, so it never reads as `0`.
pub fn parse_selection(input: &str, count: usize) -> Result<Selection, SelectionError> {
    let input = input.trim();
    if input == "00" {
        return Ok(Selection::Fallback);
    }
    let n: usize = input
        .parse()
        .map_err(|_| SelectionError::NotANumber { max: count })?;
    match n {
        0 => Ok(Selection::Lookup),
        n if n <= count => Ok(Selection::Candidate(n - 1)),
        _ => Err(SelectionError::OutOfRange { max: count }),
    }
}

/// The outcome of one round at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    Pick(ProviderResult),
    /// A metadata link or search query to try next.
    NewQuery(String),
    Fallback,
}

/// Merges per-provider result lists in provider order, dropping repeats.
pub fn merge_candidates(batches: Vec<Vec<ProviderResult>>) -> Vec<ProviderResult> {
    let mut merged: Vec<ProviderResult> = Vec::new();
    for result in batches.into_iter().flatten() {
        if !merged.iter().any(|seen| seen.same_track(&result)) {
            merged.push(result);
        }
    }
    merged
}

pub fn render_table(candidates: &[ProviderResult]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["#", "Title", "Artist", "Album", "Year", "Source"]);
    for (i, result) in candidates.iter().enumerate() {
        let year = result
            .year()
            .map(|y| y.to_string())
            .unwrap_or_else(|| UNKNOWN.to_string());
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&result.title),
            Cell::new(&result.artist),
            Cell::new(result.album.as_deref().unwrap_or(UNKNOWN)),
            Cell::new(year),
            Cell::new(result.source),
        ]);
    }
    table
}

/// Shows candidates and runs the timed selection prompt.
pub struct Presenter {
    prompter: Prompter,
}

impl Presenter {
    pub fn new(prompter: Prompter) -> Self {
        Self { prompter }
    }

    /// One countdown covers the whole round: invalid input re-prompts
    /// against the same deadline. Timeout or closed input means fallback.
    pub fn present(&mut self, candidates: &[ProviderResult]) -> Choice {
        let prompt = if candidates.is_empty() {
            println!("\nNo matches found.");
            "Enter 0 to provide link/name, 00 for YouTube metadata: ".to_string()
        } else {
            println!("\nFound the following matches:");
            println!("{}", render_table(candidates));
            format!(
                "Select option (1-{}), 0 to provide link/name, 00 for YouTube metadata: ",
                candidates.len()
            )
        };

        let deadline = self.prompter.start_countdown();
        loop {
            print_inline(&format!(
                "{}[{}s] ",
                prompt,
                self.prompter.seconds_left(deadline)
            ));

            match self.prompter.read_before(deadline) {
                Answer::TimedOut => {
                    println!();
                    info!("No selection in time, using YouTube metadata");
                    return Choice::Fallback;
                }
                Answer::Closed => {
                    println!();
                    info!("Input closed, using YouTube metadata");
                    return Choice::Fallback;
                }
                Answer::Line(line) => match parse_selection(&line, candidates.len()) {
                    Ok(Selection::Candidate(i)) => {
                        let picked = candidates[i].clone();
                        info!("Selected: {}", picked.summary());
                        return Choice::Pick(picked);
                    }
                    Ok(Selection::Fallback) => {
                        info!("Using YouTube metadata");
                        return Choice::Fallback;
                    }
                    Ok(Selection::Lookup) => return self.ask_lookup(),
                    Err(e) => println!("{}", e),
                },
            }
        }
    }

    fn ask_lookup(&mut self) -> Choice {
        print_inline("Enter metadata link or search query: ");
        match self.prompter.read_line() {
            Some(line) if !line.is_empty() => Choice::NewQuery(line),
            _ => {
                info!("Nothing entered, using YouTube metadata");
                Choice::Fallback
            }
        }
    }

    #[cfg(test)]
    pub fn countdowns(&self) -> usize {
        self.prompter.countdowns()
    }
}
