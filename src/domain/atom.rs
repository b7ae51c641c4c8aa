use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Error};

/// Grid cell as (row, col).
pub type Pos = (usize, usize);

/// An indivisible fact about the world: an agent or a box occupying a cell.
///
/// Kept as a proper sum type, but packable into a single `u64` so the
/// iterated-width novelty sets can store dense integers instead of chasing
/// pointers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Atom {
    AgentAt { agent: usize, pos: Pos },
    BoxAt { id: usize, pos: Pos },
}

const KIND_BOX: u64 = 1;
const KIND_AGENT: u64 = 2;

impl Atom {
    pub fn pos(&self) -> Pos {
        match *self {
            Atom::AgentAt { pos, .. } => pos,
            Atom::BoxAt { pos, .. } => pos,
        }
    }

    /// Pack into a 64-bit integer: kind in bits 0-1, row in bits 2-17,
    /// col in bits 18-33, identifier in bits 34 and up.
    pub fn pack(self) -> u64 {
        let (kind, id, (row, col)) = match self {
            Atom::AgentAt { agent, pos } => (KIND_AGENT, agent, pos),
            Atom::BoxAt { id, pos } => (KIND_BOX, id, pos),
        };
        debug_assert!(row < (1 << 16) && col < (1 << 16));
        ((id as u64) << 34) | ((col as u64) << 18) | ((row as u64) << 2) | kind
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Atom::AgentAt { agent, pos } => write!(f, "AgentAt({agent},{},{})", pos.0, pos.1),
            Atom::BoxAt { id, pos } => write!(f, "BoxAt({id},{},{})", pos.0, pos.1),
        }
    }
}

/// Entity colors from the level's `#colors` section. An agent may only push
/// or pull boxes of its own color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Blue,
    Red,
    Cyan,
    Purple,
    Green,
    Orange,
    Pink,
    Grey,
    Lightblue,
    Brown,
}

impl FromStr for Color {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blue" => Ok(Color::Blue),
            "red" => Ok(Color::Red),
            "cyan" => Ok(Color::Cyan),
            "purple" => Ok(Color::Purple),
            "green" => Ok(Color::Green),
            "orange" => Ok(Color::Orange),
            "pink" => Ok(Color::Pink),
            "grey" => Ok(Color::Grey),
            "lightblue" => Ok(Color::Lightblue),
            "brown" => Ok(Color::Brown),
            other => Err(anyhow!("unknown color: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_distinguishes_kind_id_and_cell() {
        let atoms = [
            Atom::AgentAt { agent: 0, pos: (1, 1) },
            Atom::AgentAt { agent: 1, pos: (1, 1) },
            Atom::AgentAt { agent: 0, pos: (1, 2) },
            Atom::BoxAt { id: 0, pos: (1, 1) },
            Atom::BoxAt { id: 1, pos: (1, 1) },
            Atom::BoxAt { id: 0, pos: (2, 1) },
        ];
        let mut packed: Vec<u64> = atoms.iter().map(|a| a.pack()).collect();
        packed.sort_unstable();
        packed.dedup();
        assert_eq!(packed.len(), atoms.len());
    }

    #[test]
    fn color_parsing() {
        assert_eq!("Blue".parse::<Color>().unwrap(), Color::Blue);
        assert_eq!("  lightblue ".parse::<Color>().unwrap(), Color::Lightblue);
        assert!("mauve".parse::<Color>().is_err());
    }
}
