//! Output formatting for ranked search results

use crate::query::{RankedAuthor, SearchResults};
use serde::Serialize;
use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Print ranked authors to stdout, one per line
pub fn print_results(results: &SearchResults, limit: usize, color: bool) -> io::Result<()> {
    let choice = if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    let mut stdout = StandardStream::stdout(choice);
    write_results(&mut stdout, results, limit)
}

/// Write ranked authors as `rank  author  surname/given  occurrences  variant`
pub fn write_results<W: WriteColor>(
    out: &mut W,
    results: &SearchResults,
    limit: usize,
) -> io::Result<()> {
    if results.is_empty() {
        writeln!(out, "No authors found for {:?}", results.query)?;
        return Ok(());
    }

    for (rank, author) in results.authors.iter().take(limit).enumerate() {
        write_author(out, rank + 1, author)?;
    }

    let hidden = results.authors.len().saturating_sub(limit);
    if hidden > 0 {
        out.set_color(ColorSpec::new().set_dimmed(true))?;
        writeln!(out, "... and {} more", hidden)?;
        out.reset()?;
    }

    Ok(())
}

fn write_author<W: WriteColor>(out: &mut W, rank: usize, author: &RankedAuthor) -> io::Result<()> {
    write!(out, "{:>3}. ", rank)?;

    out.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true))?;
    write!(out, "{:<10}", author.author)?;
    out.reset()?;

    out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
    write!(
        out,
        " {:.3}/{:.3}",
        author.surname_score, author.given_name_score
    )?;
    out.reset()?;

    write!(out, " {:>5}x ", author.occurrences)?;

    match &author.best_variant {
        Some(variant) => {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)))?;
            write!(out, "{}", variant)?;
            out.reset()?;
        }
        None => write!(out, "-")?,
    }

    writeln!(out)
}

#[derive(Serialize)]
struct JsonResults<'a> {
    generation: u64,
    query: &'a str,
    authors: Vec<JsonAuthor<'a>>,
}

#[derive(Serialize)]
struct JsonAuthor<'a> {
    author: u32,
    surname_score: f64,
    given_name_score: f64,
    occurrences: u64,
    best_variant: Option<&'a str>,
}

/// Print results as a JSON document
pub fn print_json(results: &SearchResults, limit: usize) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut lock = stdout.lock();
    write_json(&mut lock, results, limit)?;
    writeln!(lock)?;
    Ok(())
}

pub fn write_json<W: Write>(out: &mut W, results: &SearchResults, limit: usize) -> anyhow::Result<()> {
    let doc = JsonResults {
        generation: results.generation,
        query: &results.query,
        authors: results
            .authors
            .iter()
            .take(limit)
            .map(|a| JsonAuthor {
                author: a.author,
                surname_score: a.surname_score,
                given_name_score: a.given_name_score,
                occurrences: a.occurrences,
                best_variant: a.best_variant.as_deref(),
            })
            .collect(),
    };
    serde_json::to_writer_pretty(out, &doc)?;
    Ok(())
}
