//! Explicit ownership of mounted grids.

use std::collections::HashMap;
use std::fmt;

use crate::command::Command;
use crate::error::GridError;
use crate::grid::Grid;

/// Identifies a mounted grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridHandle(usize);

impl fmt::Display for GridHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "__grid_{}", self.0)
    }
}

/// Maps handles to grid controllers.
///
/// Whoever mounts grids owns the registry; there is no global instance.
/// Handles are minted per registry and never reused within it. Unmounting
/// drops the grid, which cancels its outstanding fetch.
#[derive(Default)]
pub struct GridRegistry {
    grids: HashMap<GridHandle, Grid>,
    next: usize,
}

impl GridRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mount(&mut self, grid: Grid) -> GridHandle {
        let handle = GridHandle(self.next);
        self.next += 1;
        log::debug!("Mounted grid {handle}");
        self.grids.insert(handle, grid);
        handle
    }

    pub fn get(&self, handle: GridHandle) -> Option<&Grid> {
        self.grids.get(&handle)
    }

    pub fn get_mut(&mut self, handle: GridHandle) -> Option<&mut Grid> {
        self.grids.get_mut(&handle)
    }

    /// Removes and returns a grid. Dropping the result destroys it.
    pub fn unmount(&mut self, handle: GridHandle) -> Option<Grid> {
        let grid = self.grids.remove(&handle);
        if grid.is_some() {
            log::debug!("Unmounted grid {handle}");
        }
        grid
    }

    /// Dispatches a command to a mounted grid.
    ///
    /// Unknown handles are a silent no-op.
    pub fn dispatch(&mut self, handle: GridHandle, command: Command) -> Result<(), GridError> {
        match self.grids.get_mut(&handle) {
            Some(grid) => grid.dispatch(command),
            None => {
                log::debug!("No grid mounted at {handle}");
                Ok(())
            }
        }
    }

    /// Applies ready completions on every grid.
    pub fn pump_all(&mut self) -> usize {
        self.grids.values_mut().map(Grid::pump).sum()
    }

    pub fn len(&self) -> usize {
        self.grids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grids.is_empty()
    }
}
