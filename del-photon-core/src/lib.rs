pub mod error;
pub mod fresnel;
pub mod kdtree;
pub mod material;
pub mod photon;
pub mod scene;
pub mod tally;
pub mod triangle;
pub mod trimesh3_primitive;
pub mod vec3;

pub use error::{PhotonError, Result};
