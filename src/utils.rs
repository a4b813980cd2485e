// SPDX-License-Identifier: MPL-2.0

//! Utility functions for parsing command-line and config values

use crate::backends::Resolution;

/// Parse resolution string in format "WIDTHxHEIGHT"
pub fn parse_resolution(resolution_str: &str) -> Option<Resolution> {
    let (w, h) = resolution_str.trim().split_once(['x', 'X'])?;
    let width = w.trim().parse::<u32>().ok()?;
    let height = h.trim().parse::<u32>().ok()?;
    Some(Resolution::new(width, height))
}

/// Parse a possibly fractional size in format "WIDTHxHEIGHT"
pub fn parse_size(size_str: &str) -> Option<(f64, f64)> {
    let (w, h) = size_str.trim().split_once(['x', 'X'])?;
    let width = w.trim().parse::<f64>().ok()?;
    let height = h.trim().parse::<f64>().ok()?;
    Some((width, height))
}
