//! UCI (Universal Chess Interface) Protocol Handler
//!
//! The stdin loop runs on the calling thread; every `go` hands the searcher
//! to a fresh worker thread which owns it until the search finishes and
//! returns it through the join handle. A shared atomic stop flag is the only
//! other state crossing the two threads.

use shakmaty::fen::Fen;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Move, Position};
use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::engine::book::OpeningBook;
use crate::engine::eval::evaluate;
use crate::engine::position_hash;
use crate::engine::search::{SearchLimits, Searcher};
use crate::engine::syzygy::{wdl_to_score, SyzygyTablebase};

/// Engine name and author
const ENGINE_NAME: &str = "Heron";
const ENGINE_AUTHOR: &str = "the Heron developers";
const ENGINE_VERSION: &str = "1.0.0";

/// UCI Engine handler
pub struct Uci {
    /// Current position
    pub board: Chess,
    /// Zobrist keys of the game so far, for repetition detection
    game_history: Vec<u64>,
    /// The searcher, when no worker thread holds it
    searcher: Option<Searcher>,
    /// The worker thread of a running (or finished) search
    search_thread: Option<JoinHandle<Searcher>>,
    stop: Arc<AtomicBool>,
    book: Option<OpeningBook>,
    own_book: bool,
    tablebase: Option<SyzygyTablebase>,
}

impl Uci {
    /// Create a new UCI handler
    pub fn new() -> Self {
        let board = Chess::default();
        let searcher = Searcher::new();
        let stop = searcher.stop_flag();
        let game_history = vec![position_hash(&board)];
        Uci {
            board,
            game_history,
            searcher: Some(searcher),
            search_thread: None,
            stop,
            book: None,
            own_book: false,
            tablebase: None,
        }
    }

    /// Main UCI loop
    pub fn run(&mut self) {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(l) => l,
                Err(_) => break,
            };

            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line == "quit" {
                self.cmd_quit();
                break;
            }
            self.handle_command(line);
        }
    }

    /// Dispatch a single UCI command
    pub fn handle_command(&mut self, line: &str) {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() {
            return;
        }

        match parts[0] {
            "uci" => self.cmd_uci(),
            "isready" => self.cmd_isready(),
            "setoption" => self.cmd_setoption(&parts),
            "ucinewgame" => self.cmd_ucinewgame(),
            "position" => self.cmd_position(&parts),
            "go" => self.cmd_go(&parts),
            "stop" => self.cmd_stop(),
            "ponderhit" => {} // Not implemented
            // Non-standard but useful commands
            "eval" => self.cmd_eval(),
            "perft" => self.cmd_perft(&parts),
            _ => {}
        }
    }

    /// Recover the searcher, joining the worker thread if one is running.
    ///
    /// Blocks until the worker finishes; callers that must not wait on an
    /// unbounded search (a bare `go infinite`) are expected to set the stop
    /// flag first, as GUIs do.
    fn take_searcher(&mut self) -> Searcher {
        if let Some(handle) = self.search_thread.take() {
            return match handle.join() {
                Ok(searcher) => searcher,
                // The worker never panics by design; if it somehow did,
                // start over with a fresh searcher rather than poisoning
                // the session.
                Err(_) => Searcher::new(),
            };
        }
        self.searcher.take().unwrap_or_default()
    }

    /// Wait for a running search to finish and reclaim the searcher.
    pub fn wait_for_search(&mut self) {
        let searcher = self.take_searcher();
        self.searcher = Some(searcher);
    }

    fn cmd_uci(&self) {
        println!("id name {} {}", ENGINE_NAME, ENGINE_VERSION);
        println!("id author {}", ENGINE_AUTHOR);
        println!();
        println!("option name Hash type spin default 64 min 1 max 4096");
        println!("option name Threads type spin default 1 min 1 max 1");
        println!("option name OwnBook type check default false");
        println!("option name BookFile type string default <empty>");
        println!("option name SyzygyPath type string default <empty>");
        println!("uciok");
        let _ = io::stdout().flush();
    }

    fn cmd_isready(&self) {
        println!("readyok");
        let _ = io::stdout().flush();
    }

    /// Handle 'setoption name <name> [value <value>]'
    pub fn cmd_setoption(&mut self, parts: &[&str]) {
        let mut name = String::new();
        let mut value = String::new();
        let mut in_name = false;
        let mut in_value = false;

        for part in parts.iter().skip(1) {
            match *part {
                "name" => {
                    in_name = true;
                    in_value = false;
                }
                "value" => {
                    in_name = false;
                    in_value = true;
                }
                _ => {
                    let target = if in_name {
                        &mut name
                    } else if in_value {
                        &mut value
                    } else {
                        continue;
                    };
                    if !target.is_empty() {
                        target.push(' ');
                    }
                    target.push_str(part);
                }
            }
        }

        match name.to_lowercase().as_str() {
            "hash" => {
                if let Ok(size) = value.parse::<usize>() {
                    let mut searcher = self.take_searcher();
                    if !searcher.set_hash_size(size.clamp(1, 4096)) {
                        eprintln!("hash resize to {} MB failed, keeping previous table", size);
                    }
                    self.searcher = Some(searcher);
                }
            }
            "threads" => {
                // Single search worker; the option is advertised for GUI
                // compatibility only.
            }
            "ownbook" => {
                self.own_book = value.eq_ignore_ascii_case("true");
            }
            "bookfile" => match OpeningBook::open(&value) {
                Ok(book) => {
                    println!("info string loaded book with {} entries", book.len());
                    self.book = Some(book);
                }
                Err(e) => {
                    eprintln!("book load failed: {}", e);
                    self.book = None;
                }
            },
            "syzygypath" => match SyzygyTablebase::new(&value) {
                Ok(tb) => {
                    println!(
                        "info string loaded {} syzygy tables, up to {} pieces",
                        tb.table_count(),
                        tb.max_pieces()
                    );
                    self.tablebase = Some(tb);
                }
                Err(e) => {
                    eprintln!("tablebase init failed: {}", e);
                    self.tablebase = None;
                }
            },
            _ => {}
        }
    }

    /// Handle 'ucinewgame'
    pub fn cmd_ucinewgame(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        let mut searcher = self.take_searcher();
        searcher.clear();
        self.searcher = Some(searcher);

        self.board = Chess::default();
        self.game_history = vec![position_hash(&self.board)];
    }

    /// Handle 'position (startpos | fen <fen>) [moves <move>*]'
    pub fn cmd_position(&mut self, parts: &[&str]) {
        if parts.len() < 2 {
            return;
        }

        let mut idx = 1;
        if parts[idx] == "startpos" {
            self.board = Chess::default();
            idx += 1;
        } else if parts[idx] == "fen" {
            let mut fen_parts = Vec::new();
            idx += 1;
            while idx < parts.len() && parts[idx] != "moves" {
                fen_parts.push(parts[idx]);
                idx += 1;
            }
            let fen = fen_parts.join(" ");
            let parsed = fen
                .parse::<Fen>()
                .ok()
                .and_then(|f| f.into_position(CastlingMode::Standard).ok());
            match parsed {
                Some(pos) => self.board = pos,
                None => {
                    eprintln!("Invalid FEN: {}", fen);
                    return;
                }
            }
        } else {
            return;
        }

        self.game_history = vec![position_hash(&self.board)];

        if idx < parts.len() && parts[idx] == "moves" {
            idx += 1;
            while idx < parts.len() {
                match self.parse_move(parts[idx]) {
                    Some(mv) => match self.board.clone().play(&mv) {
                        Ok(pos) => {
                            self.board = pos;
                            self.game_history.push(position_hash(&self.board));
                        }
                        Err(_) => {
                            eprintln!("Illegal move: {}", parts[idx]);
                            break;
                        }
                    },
                    None => {
                        eprintln!("Illegal move: {}", parts[idx]);
                        break;
                    }
                }
                idx += 1;
            }
        }
    }

    /// Parse a move in coordinate notation and validate it against the
    /// current position.
    pub fn parse_move(&self, move_str: &str) -> Option<Move> {
        let uci: UciMove = move_str.parse().ok()?;
        uci.to_move(&self.board).ok()
    }

    /// Handle 'go [...]': consult the oracles, then hand the searcher to a
    /// worker thread. The worker prints `bestmove` when it is done.
    pub fn cmd_go(&mut self, parts: &[&str]) {
        let limits = parse_go(parts);

        // Oracles first; the first one with a legal answer wins.
        if self.own_book {
            if let Some(book) = self.book.as_mut() {
                if let Some(mv) = book.probe(&self.board) {
                    println!("bestmove {}", mv.to_uci(CastlingMode::Standard));
                    let _ = io::stdout().flush();
                    return;
                }
            }
        }
        if let Some(tb) = &self.tablebase {
            if let Some(mv) = tb.probe_root(&self.board) {
                if let Some(wdl) = tb.probe_wdl(&self.board) {
                    println!("info string tablebase score cp {}", wdl_to_score(wdl, 0));
                }
                println!("bestmove {}", mv.to_uci(CastlingMode::Standard));
                let _ = io::stdout().flush();
                return;
            }
        }

        let mut searcher = self.take_searcher();
        // Re-sync in case the searcher was replaced on recovery.
        self.stop = searcher.stop_flag();
        self.stop.store(false, Ordering::Relaxed);
        let pos = self.board.clone();
        let history = self.game_history.clone();

        self.search_thread = Some(std::thread::spawn(move || {
            let result = searcher.search(&pos, limits, &history);
            match result.best_move {
                Some(mv) => println!("bestmove {}", mv.to_uci(CastlingMode::Standard)),
                None => println!("bestmove 0000"),
            }
            let _ = io::stdout().flush();
            searcher
        }));
    }

    /// Handle 'stop': the worker unwinds and emits its `bestmove`.
    pub fn cmd_stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    fn cmd_quit(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        self.wait_for_search();
    }

    /// Handle 'eval' - non-standard but useful
    fn cmd_eval(&self) {
        println!("Evaluation: {} cp (side to move)", evaluate(&self.board));
    }

    /// Handle 'perft <depth>' - non-standard but useful for testing
    fn cmd_perft(&self, parts: &[&str]) {
        let depth: u32 = parts
            .get(1)
            .and_then(|d| d.parse().ok())
            .unwrap_or(1)
            .max(1);

        let start = std::time::Instant::now();
        let mut nodes = 0u64;
        for mv in self.board.legal_moves() {
            let child = match self.board.clone().play(&mv) {
                Ok(p) => p,
                Err(_) => continue,
            };
            let count = perft(&child, depth - 1);
            println!("{}: {}", mv.to_uci(CastlingMode::Standard), count);
            nodes += count;
        }
        let elapsed = start.elapsed();

        println!();
        println!("Nodes: {}", nodes);
        println!("Time: {:?}", elapsed);
        let _ = io::stdout().flush();
    }
}

fn perft(pos: &Chess, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }
    let mut nodes = 0;
    for mv in pos.legal_moves() {
        if let Ok(child) = pos.clone().play(&mv) {
            nodes += perft(&child, depth - 1);
        }
    }
    nodes
}

/// Parse the arguments of a 'go' command.
fn parse_go(parts: &[&str]) -> SearchLimits {
    let mut limits = SearchLimits::default();

    let mut idx = 1;
    while idx < parts.len() {
        let take_value = |limit: &mut Option<u64>| {
            if let Some(v) = parts.get(idx + 1).and_then(|v| v.parse().ok()) {
                *limit = Some(v);
            }
        };
        match parts[idx] {
            "wtime" => {
                take_value(&mut limits.wtime);
                idx += 2;
            }
            "btime" => {
                take_value(&mut limits.btime);
                idx += 2;
            }
            "winc" => {
                take_value(&mut limits.winc);
                idx += 2;
            }
            "binc" => {
                take_value(&mut limits.binc);
                idx += 2;
            }
            "movetime" => {
                take_value(&mut limits.movetime);
                idx += 2;
            }
            "nodes" => {
                take_value(&mut limits.nodes);
                idx += 2;
            }
            "movestogo" => {
                limits.movestogo = parts.get(idx + 1).and_then(|v| v.parse().ok());
                idx += 2;
            }
            "depth" => {
                limits.depth = parts.get(idx + 1).and_then(|v| v.parse().ok());
                idx += 2;
            }
            "mate" => {
                // Search deep enough to find a mate in the given move count.
                if let Some(mate_in) = parts.get(idx + 1).and_then(|v| v.parse::<i32>().ok()) {
                    limits.depth = Some(mate_in * 2);
                }
                idx += 2;
            }
            "infinite" => {
                limits.infinite = true;
                idx += 1;
            }
            _ => {
                idx += 1;
            }
        }
    }

    // A bare 'go' gets a sane default depth.
    if limits.depth.is_none()
        && limits.nodes.is_none()
        && limits.movetime.is_none()
        && limits.wtime.is_none()
        && limits.btime.is_none()
        && !limits.infinite
    {
        limits.depth = Some(8);
    }

    limits
}

impl Default for Uci {
    fn default() -> Self {
        Self::new()
    }
}
