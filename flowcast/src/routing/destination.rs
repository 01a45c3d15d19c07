//! Route destinations.

use crate::coord::Coordinate;

/// A place the user wants to be routed to.
#[derive(Debug, Clone, PartialEq)]
pub struct Destination {
    /// Display name for the navigation header, if known.
    pub name: Option<String>,
    pub coordinate: Coordinate,
}

impl Destination {
    pub fn new(coordinate: Coordinate) -> Self {
        Self {
            name: None,
            coordinate,
        }
    }

    pub fn named(name: impl Into<String>, coordinate: Coordinate) -> Self {
        Self {
            name: Some(name.into()),
            coordinate,
        }
    }
}

impl From<Coordinate> for Destination {
    fn from(coordinate: Coordinate) -> Self {
        Self::new(coordinate)
    }
}
