pub mod constants;
pub mod grid;
pub mod mesh;
pub mod room;
pub mod sector;
pub mod skeleton;

pub use constants::{HEIGHT_EPS, MAX_SECTOR_CHAIN, SECTOR_SIZE};
pub use grid::SectorGrid;
pub use mesh::MeshData;
pub use room::{Room, RoomId, RoomSet, StaticMeshInstance};
pub use sector::{DiagonalType, PenetrationConfig, Sector, SectorRef};
pub use skeleton::{BoneDesc, Skeleton};
