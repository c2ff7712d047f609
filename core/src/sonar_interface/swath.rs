use crate::sonar_interface::messages::NavigationState;
use ndarray::{Array2, ArrayView1};

/// One ping of starboard/port intensities with the navigation captured at arrival.
///
/// Missing samples are represented by `NaN`.
#[derive(Debug, Clone)]
pub struct Swath {
    pub right: Vec<f64>,
    pub left: Vec<f64>,
    pub state: NavigationState,
    pub altitude: f64,
}

impl Swath {
    pub fn new(right: Vec<f64>, left: Vec<f64>, state: NavigationState, altitude: f64) -> Self {
        Self {
            right,
            left,
            state,
            altitude,
        }
    }

    pub fn len(&self) -> usize {
        self.right.len()
    }

    pub fn is_empty(&self) -> bool {
        self.right.is_empty()
    }

    pub fn channels_balanced(&self) -> bool {
        self.right.len() == self.left.len()
    }
}

/// Georeferenced swath: a 6xN table of coordinates and intensities.
#[derive(Debug, Clone)]
pub struct CoordinateFrame {
    data: Array2<f64>,
}

impl CoordinateFrame {
    pub const X_RIGHT: usize = 0;
    pub const X_LEFT: usize = 1;
    pub const Y_RIGHT: usize = 2;
    pub const Y_LEFT: usize = 3;
    pub const INTENSITY_RIGHT: usize = 4;
    pub const INTENSITY_LEFT: usize = 5;
    pub const ROWS: usize = 6;

    /// Wraps a table; returns `None` unless it has exactly six rows.
    pub fn from_table(data: Array2<f64>) -> Option<Self> {
        (data.nrows() == Self::ROWS).then_some(Self { data })
    }

    /// Zero-filled frame for `n` samples.
    pub fn with_samples(n: usize) -> Self {
        Self {
            data: Array2::zeros((Self::ROWS, n)),
        }
    }

    pub(crate) fn table_mut(&mut self) -> &mut Array2<f64> {
        &mut self.data
    }

    pub fn len(&self) -> usize {
        self.data.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.data.ncols() == 0
    }

    pub fn row(&self, index: usize) -> ArrayView1<'_, f64> {
        self.data.row(index)
    }

    pub fn table(&self) -> &Array2<f64> {
        &self.data
    }
}
