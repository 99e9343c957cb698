//! Terminal front-end: reads one move or command per line from stdin and
//! prints the board after every move.
//!
//! Commands:
//!
//! - `e2 e4`: play a move (pawns reaching the last rank become queens)
//! - `moves`: list legal moves
//! - `fen`: print the position in Forsyth-Edwards Notation
//! - `save <file>`, `load <file>`: store or restore the game
//! - `quit`

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use itertools::Itertools;
use kingside::chess::core::{File, Player, Rank, Square};
use kingside::chess::game::{Game, GameStatus};
use kingside::chess::position::Position;
use kingside::chess::save;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Continue a game stored with the `save` command.
    #[arg(long, conflicts_with = "fen")]
    load: Option<PathBuf>,
    /// Start from the given position in Forsyth-Edwards Notation.
    #[arg(long)]
    fen: Option<String>,
    /// Log filter used when `RUST_LOG` is not set. Logs go to stderr.
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .init();

    kingside::print_engine_info();

    let mut game = match (&args.load, &args.fen) {
        (Some(path), _) => save::load_from_file(path)
            .with_context(|| format!("can not load {}", path.display()))?,
        (None, Some(fen)) => Game::from_position(
            Position::try_from(fen.as_str()).context("can not parse --fen position")?,
        ),
        (None, None) => Game::new(),
    };
    render(&game)?;

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let line = line.trim();
        let (command, argument) = match line.split_once(char::is_whitespace) {
            Some((command, argument)) => (command, argument.trim()),
            None => (line, ""),
        };
        match command {
            "" => continue,
            "quit" => break,
            "moves" => {
                println!("{}", game.legal_moves()?.iter().join(" "));
                continue;
            },
            "fen" => {
                println!("{}", game.position());
                continue;
            },
            "save" => {
                match save::save_to_file(&game, argument) {
                    Ok(()) => println!("Saved to {argument}"),
                    Err(e) => println!("Error: {e}"),
                }
                continue;
            },
            "load" => {
                match save::load_from_file(argument) {
                    Ok(loaded) => {
                        game = loaded;
                        println!("Loaded {argument}");
                        render(&game)?;
                    },
                    Err(e) => println!("Error: {e}"),
                }
                continue;
            },
            _ => (),
        }
        let mover = game.side_to_move();
        match game.play(line) {
            Ok(report) => {
                if let Some(captured) = report.captured {
                    println!("{mover:?} captures {:?} on {}", captured.kind, report.played.to());
                }
                render(&game)?;
            },
            Err(e) => println!("Error: {e}"),
        }
    }
    Ok(())
}

fn render(game: &Game) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    let files = File::ALL.iter().join(" ");
    writeln!(out, "  {files}")?;
    for rank in Rank::ALL.into_iter().rev() {
        let cells = File::ALL
            .into_iter()
            .map(|file| match game.position().board().at(Square::new(file, rank)) {
                Some(piece) => piece.to_string(),
                None => ".".to_string(),
            })
            .join(" ");
        writeln!(out, "{rank} {cells} {rank}")?;
    }
    writeln!(out, "  {files}")?;
    let status = game.status()?;
    writeln!(
        out,
        "Move {}, {:?} to move: {status}",
        game.position().fullmove_counter(),
        game.side_to_move()
    )?;
    let white = game.clock().elapsed(Player::White);
    let black = game.clock().elapsed(Player::Black);
    writeln!(
        out,
        "White {} | Black {} | Total {}",
        format_clock(white),
        format_clock(black),
        format_clock(white.saturating_add(black))
    )?;
    match status {
        GameStatus::CheckmateBy(winner) => writeln!(out, "Game over: {winner:?} wins")?,
        GameStatus::Stalemate => writeln!(out, "Game over: draw")?,
        GameStatus::InProgress | GameStatus::Check(_) => (),
    }
    out.flush()?;
    Ok(())
}

fn format_clock(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs();
    format!("{:02}:{:02}:{:02}", seconds / 3600, seconds / 60 % 60, seconds % 60)
}
