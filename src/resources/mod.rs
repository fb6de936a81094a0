//! Resource systems (§4.2-§4.4): shaders, textures, meshes, materials, and
//! the render-pass / render-state / render-target configuration types.

pub mod material;
pub mod mesh;
pub mod render_pass;
pub mod render_state;
pub mod render_target;
pub mod shader;
pub mod texture;
