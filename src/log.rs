//! Append-only iterate log (spec section 3) and the persisted-log shape
//! (spec section 6). Actual file persistence is a thin, optional helper:
//! only the shape of what is logged is specified, not a storage engine.

use std::io::{self, Write};
use std::path::Path;

use crate::types::{OperatingPoint, Strategy};

/// One iterate: the operating point produced and the strategies used to
/// produce it.
#[derive(Debug, Clone)]
pub struct Iterate {
    pub operating_point: OperatingPoint,
    pub strategies: Vec<Strategy>,
}

/// Append-only sequence of iterates, bounded by the outer loop's iteration
/// cap.
#[derive(Debug, Default)]
pub struct Log {
    entries: Vec<Iterate>,
}

impl Log {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn push(&mut self, operating_point: OperatingPoint, strategies: Vec<Strategy>) {
        self.entries.push(Iterate {
            operating_point,
            strategies,
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Iterate> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&Iterate> {
        self.entries.last()
    }
}

/// Write one iterate to `root/<zero-padded index>/{xs.txt,costs.txt}`.
///
/// `xs.txt` has one row per time step: the joint state as whitespace
/// separated floats. `costs.txt` has one row: each player's total
/// trajectory cost, whitespace separated.
pub fn write_iterate(
    root: &Path,
    index: usize,
    operating_point: &OperatingPoint,
    player_costs: &[f64],
) -> io::Result<()> {
    let dir = root.join(format!("{index:06}"));
    std::fs::create_dir_all(&dir)?;

    let mut xs_file = std::fs::File::create(dir.join("xs.txt"))?;
    for x in &operating_point.xs {
        let row: Vec<String> = x.iter().map(|v| v.to_string()).collect();
        writeln!(xs_file, "{}", row.join(" "))?;
    }

    let mut costs_file = std::fs::File::create(dir.join("costs.txt"))?;
    let row: Vec<String> = player_costs.iter().map(|v| v.to_string()).collect();
    writeln!(costs_file, "{}", row.join(" "))?;

    Ok(())
}
