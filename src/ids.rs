//! Public handle type aliases.
//!
//! Each resource kind gets its own zero-sized tag so that, say, a
//! `MeshHandle` and a `TextureHandle` are distinct types even though both
//! are `Handle<_>` over the same representation. This is the type-level
//! counterpart of each resource system owning an exclusive [`crate::handle::SlotTable`].

use crate::handle::Handle;

pub struct ShaderTag;
pub type ShaderHandle = Handle<ShaderTag>;

pub struct TextureTag;
pub type TextureHandle = Handle<TextureTag>;

pub struct MeshTag;
pub type MeshHandle = Handle<MeshTag>;

pub struct MaterialTag;
pub type MaterialHandle = Handle<MaterialTag>;

pub struct RenderPassTag;
pub type RenderPassHandle = Handle<RenderPassTag>;

pub struct RenderTargetTag;
pub type RenderTargetHandle = Handle<RenderTargetTag>;

pub struct RenderStateTag;
pub type RenderStateHandle = Handle<RenderStateTag>;
