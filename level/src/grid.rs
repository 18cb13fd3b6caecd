//! Sector grid encoding/decoding helpers.
//!
//! Every room stores its sectors as a dense grid in X-major order. This module
//! centralizes that layout so lookups by world position and by grid coordinates
//! agree everywhere.
//!
//! # Model
//! - A room's grid is `sectors_x x sectors_z` cells of [`SECTOR_SIZE`] meters.
//! - The grid's minimum corner sits at the room origin (world XZ).
//! - Linear index: `index = gx * sectors_z + gz`.

use nalgebra::{Point3, Vector3};

use crate::constants::{INV_SECTOR_SIZE, SECTOR_SIZE};

/// Dimensions and placement of one room's sector grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SectorGrid {
    /// World position of the grid's minimum (X, Z) corner. `y` is ignored.
    pub origin: Vector3<f32>,
    pub sectors_x: u16,
    pub sectors_z: u16,
}

impl SectorGrid {
    pub fn new(origin: Vector3<f32>, sectors_x: u16, sectors_z: u16) -> Self {
        Self {
            origin,
            sectors_x,
            sectors_z,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sectors_x as usize * self.sectors_z as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Linearize grid coordinates. Returns `None` outside the grid.
    #[inline]
    pub fn encode(&self, gx: u16, gz: u16) -> Option<usize> {
        if gx >= self.sectors_x || gz >= self.sectors_z {
            return None;
        }
        Some(gx as usize * self.sectors_z as usize + gz as usize)
    }

    /// Inverse of [`SectorGrid::encode`].
    #[inline]
    pub fn decode(&self, index: usize) -> Option<(u16, u16)> {
        if index >= self.len() {
            return None;
        }
        let gx = index / self.sectors_z as usize;
        let gz = index % self.sectors_z as usize;
        Some((gx as u16, gz as u16))
    }

    /// Grid coordinates of the sector containing the world position (x, z).
    ///
    /// Unlike the open-world cell grid this does NOT clamp: positions outside the
    /// room's footprint have no sector.
    #[inline]
    pub fn coords_at(&self, pos: &Point3<f32>) -> Option<(u16, u16)> {
        let gx = ((pos.x - self.origin.x) * INV_SECTOR_SIZE).floor();
        let gz = ((pos.z - self.origin.z) * INV_SECTOR_SIZE).floor();
        if gx < 0.0 || gz < 0.0 || gx >= self.sectors_x as f32 || gz >= self.sectors_z as f32 {
            return None;
        }
        Some((gx as u16, gz as u16))
    }

    /// Linear index of the sector containing the world position.
    #[inline]
    pub fn index_at(&self, pos: &Point3<f32>) -> Option<usize> {
        let (gx, gz) = self.coords_at(pos)?;
        self.encode(gx, gz)
    }

    /// World (x, z) of the sector's minimum corner.
    #[inline]
    pub fn min_corner(&self, gx: u16, gz: u16) -> (f32, f32) {
        (
            self.origin.x + gx as f32 * SECTOR_SIZE,
            self.origin.z + gz as f32 * SECTOR_SIZE,
        )
    }

    /// World (x, z) of the sector's center.
    #[inline]
    pub fn center(&self, gx: u16, gz: u16) -> (f32, f32) {
        let (x, z) = self.min_corner(gx, gz);
        (x + SECTOR_SIZE * 0.5, z + SECTOR_SIZE * 0.5)
    }
}
