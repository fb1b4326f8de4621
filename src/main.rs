//! Heron UCI Chess Engine

use heron_chess::uci::Uci;

fn main() {
    println!("Heron 1.0.0 - UCI Chess Engine");

    let mut uci = Uci::new();
    uci.run();
}
