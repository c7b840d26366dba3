pub mod geom;
pub mod io;
pub mod mesh;
pub mod remap;
pub mod vecutils;

// Prelude
pub use geom::point::Point;
pub use geom::vector::Vector;
pub use mesh::PolyMesh;
pub use remap::{
    AddressingTables, ConservativeInterpolator, FieldValue, PatchMapper, RemapConfig, RemapError, Tensor, VolField,
};
