//! Map parsing: a 2D grid of cell symbols into spawn directives.

/// Symbols that mean "nothing here".
const EMPTY_SYMBOLS: [&str; 3] = ["empty", ".", " "];

/// One non-empty map cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MapSpawn {
    pub row: u16,
    pub col: u16,
    pub symbol: String,
}

/// Walk the map row-major, yielding non-empty cells in scan order.
///
/// Scan order is load-bearing: agents receive their dense ids in the order
/// this function yields them.
pub fn spawns(map: &[Vec<String>]) -> impl Iterator<Item = MapSpawn> + '_ {
    map.iter().enumerate().flat_map(|(r, row)| {
        row.iter()
            .enumerate()
            .filter(|(_, sym)| !EMPTY_SYMBOLS.contains(&sym.as_str()))
            .map(move |(c, sym)| MapSpawn {
                row: r as u16,
                col: c as u16,
                symbol: sym.clone(),
            })
    })
}

/// `(height, width)` of a map; width is the longest row (short rows read as
/// empty-padded).
pub fn dimensions(map: &[Vec<String>]) -> (u16, u16) {
    let height = map.len() as u16;
    let width = map.iter().map(|r| r.len()).max().unwrap_or(0) as u16;
    (height, width)
}
