use crate::config::{MAX_COLUMNS, MIN_COLUMNS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCell {
    pub row: usize,
    pub column: usize,
    pub index: usize,
}

pub fn clamp_columns(columns: usize) -> usize {
    columns.clamp(MIN_COLUMNS, MAX_COLUMNS)
}

pub fn grid_rows(count: usize, columns: usize) -> usize {
    count.div_ceil(clamp_columns(columns))
}

/// Row-major cell positions for `count` items.
pub fn grid_cells(count: usize, columns: usize) -> impl Iterator<Item = GridCell> {
    let columns = clamp_columns(columns);
    (0..count).map(move |index| GridCell {
        row: index / columns,
        column: index % columns,
        index,
    })
}

/// Width of one column when `available` is shared by `columns` with `gap`
/// between neighbours.
pub fn column_width(available: f32, columns: usize, gap: f32) -> f32 {
    let columns = clamp_columns(columns) as f32;
    ((available - gap * (columns - 1.0)) / columns).max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_round_up() {
        assert_eq!(grid_rows(0, 3), 0);
        assert_eq!(grid_rows(7, 3), 3);
        assert_eq!(grid_rows(9, 3), 3);
        assert_eq!(grid_rows(5, 0), 5);
    }

    #[test]
    fn cells_are_row_major() {
        let cells = grid_cells(5, 2).collect::<Vec<_>>();
        assert_eq!(cells.len(), 5);
        assert_eq!(
            cells[3],
            GridCell {
                row: 1,
                column: 1,
                index: 3
            }
        );
        assert_eq!(
            cells[4],
            GridCell {
                row: 2,
                column: 0,
                index: 4
            }
        );
    }

    #[test]
    fn column_width_shares_space() {
        assert_eq!(column_width(310.0, 3, 5.0), 100.0);
        assert_eq!(column_width(50.0, 1, 5.0), 50.0);
        assert_eq!(column_width(0.0, 4, 5.0), 1.0);
        assert_eq!(clamp_columns(25), 10);
    }
}
