use serde::{Deserialize, Serialize};

/// Joystick state as published by a joystick driver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Joy {
    pub axes: Vec<f64>,
    pub buttons: Vec<i32>,
}

impl Joy {
    pub fn new(axes: Vec<f64>, buttons: Vec<i32>) -> Self {
        Self { axes, buttons }
    }

    /// Value of axis `index`, neutral (`0.0`) if the joystick has no such axis.
    pub fn axis(&self, index: usize) -> f64 {
        self.axes.get(index).copied().unwrap_or_default()
    }

    pub fn is_pressed(&self, index: usize) -> bool {
        self.buttons.get(index).is_some_and(|&b| b != 0)
    }
}
