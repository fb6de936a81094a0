//! Texture resources, including the async load pipeline (§4.2, §4.5).
//!
//! Decoding bytes into pixels is supplied by the host via [`TextureResolver`]
//! — this mirrors the teacher's `TextureResolver`/`LoadableImage` split in
//! `texture/image.rs`; this crate only schedules, caches and uploads.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::{BackendFatal, JobFailed};
use crate::handle::SlotTable;
use crate::ids::TextureHandle;
use crate::loader::{CompletionStore, Priority, SyncPoint, WorkerPool};
use crate::rhi::{BackendId, Rhi};
use crate::types::TextureUse;

/// Fully decoded pixel data, ready for upload. Produced off the main thread
/// by a [`TextureResolver`].
#[derive(Debug, Clone)]
pub struct TextureDefinition {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    pub has_transparency: bool,
    pub pixels: Vec<u8>,
}

/// Decodes a named asset into pixel data. Implemented by the host
/// application; this crate never parses an image format itself.
pub trait TextureResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Result<TextureDefinition, String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Unloaded,
    Loading,
    Loaded,
    Failed,
}

#[derive(Debug, Clone)]
pub struct Texture {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    pub has_transparency: bool,
    pub texture_use: TextureUse,
    pub backend_image: Option<BackendId>,
    pub load_state: LoadState,
    /// Resident pixel data for the built-in default textures, so a
    /// `Loading`/`Failed` lookup has something to draw before (or without)
    /// an RHI upload. Empty for regular textures, whose definition is
    /// dropped once uploaded.
    pub pixels: Vec<u8>,
}

struct PendingLoad {
    handle: TextureHandle,
    name: String,
    sync_point: SyncPoint,
}

const DEFAULT_TEXTURE_SIZE: u32 = 256;
const CHECKER_SQUARE: u32 = 32;

/// Grounded on the original `TextureSystem::GenerateDefaultTextures`'s
/// magenta/white checker.
fn checker_pixels(a: [u8; 4], b: [u8; 4]) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((DEFAULT_TEXTURE_SIZE * DEFAULT_TEXTURE_SIZE * 4) as usize);
    for y in 0..DEFAULT_TEXTURE_SIZE {
        for x in 0..DEFAULT_TEXTURE_SIZE {
            let square = (x / CHECKER_SQUARE + y / CHECKER_SQUARE).is_multiple_of(2);
            pixels.extend_from_slice(if square { &a } else { &b });
        }
    }
    pixels
}

fn solid_pixels(color: [u8; 4]) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((DEFAULT_TEXTURE_SIZE * DEFAULT_TEXTURE_SIZE * 4) as usize);
    for _ in 0..(DEFAULT_TEXTURE_SIZE * DEFAULT_TEXTURE_SIZE) {
        pixels.extend_from_slice(&color);
    }
    pixels
}

const MAGENTA: [u8; 4] = [255, 0, 255, 255];
const WHITE: [u8; 4] = [255, 255, 255, 255];
const NEUTRAL_NORMAL: [u8; 4] = [128, 128, 255, 255];
const MID_GREY: [u8; 4] = [128, 128, 128, 255];

/// Owns every live [`Texture`], its name cache, and the in-flight loads
/// still waiting on a sync point.
pub struct TextureSystem {
    slots: SlotTable<Texture>,
    by_name: Mutex<HashMap<String, TextureHandle>>,
    completions: Arc<CompletionStore<TextureDefinition>>,
    pending: Mutex<Vec<PendingLoad>>,
    pool: Arc<WorkerPool>,
    error_texture: TextureHandle,
    placeholder_normal: TextureHandle,
    placeholder_specular: TextureHandle,
}

impl TextureSystem {
    pub fn new(capacity: usize, pool: Arc<WorkerPool>) -> Self {
        let slots = SlotTable::new(capacity);
        let error_texture = slots
            .allocate(Texture {
                name: "__error_texture".to_string(),
                width: DEFAULT_TEXTURE_SIZE,
                height: DEFAULT_TEXTURE_SIZE,
                channels: 4,
                has_transparency: false,
                texture_use: TextureUse::Diffuse,
                backend_image: None,
                load_state: LoadState::Loaded,
                pixels: checker_pixels(MAGENTA, WHITE),
            })
            .retag();
        let placeholder_normal = slots
            .allocate(Texture {
                name: "__placeholder_normal".to_string(),
                width: DEFAULT_TEXTURE_SIZE,
                height: DEFAULT_TEXTURE_SIZE,
                channels: 4,
                has_transparency: false,
                texture_use: TextureUse::Normal,
                backend_image: None,
                load_state: LoadState::Loaded,
                pixels: solid_pixels(NEUTRAL_NORMAL),
            })
            .retag();
        let placeholder_specular = slots
            .allocate(Texture {
                name: "__placeholder_specular".to_string(),
                width: DEFAULT_TEXTURE_SIZE,
                height: DEFAULT_TEXTURE_SIZE,
                channels: 4,
                has_transparency: false,
                texture_use: TextureUse::Specular,
                backend_image: None,
                load_state: LoadState::Loaded,
                pixels: solid_pixels(MID_GREY),
            })
            .retag();

        TextureSystem {
            slots,
            by_name: Mutex::new(HashMap::new()),
            completions: Arc::new(CompletionStore::new()),
            pending: Mutex::new(Vec::new()),
            pool,
            error_texture,
            placeholder_normal,
            placeholder_specular,
        }
    }

    /// The built-in placeholder for `texture_use`, shown while a texture of
    /// that use is still `Loading` (§4.5): the diffuse placeholder reuses
    /// the error texture's checker, since the two are visually
    /// indistinguishable by design.
    fn placeholder_for(&self, texture_use: TextureUse) -> TextureHandle {
        match texture_use {
            TextureUse::Diffuse => self.error_texture,
            TextureUse::Normal => self.placeholder_normal,
            TextureUse::Specular => self.placeholder_specular,
        }
    }

    /// Look up a cached handle, or schedule a fresh load and return a
    /// handle that currently resolves to the `Loading` placeholder.
    pub fn get_handle_for(
        &self,
        name: &str,
        texture_use: TextureUse,
        resolver: Arc<dyn TextureResolver>,
    ) -> TextureHandle {
        let mut by_name = self.by_name.lock().unwrap();
        if let Some(existing) = by_name.get(name).copied() {
            if self.slots.is_valid(existing.retag()) {
                return existing;
            }
            by_name.remove(name);
        }

        let handle: TextureHandle = self
            .slots
            .allocate(Texture {
                name: name.to_string(),
                width: 0,
                height: 0,
                channels: 0,
                has_transparency: false,
                texture_use,
                backend_image: None,
                load_state: LoadState::Loading,
                pixels: Vec::new(),
            })
            .retag();
        by_name.insert(name.to_string(), handle);
        drop(by_name);

        let sync_point = SyncPoint::new(1);
        let name_owned = name.to_string();
        let store = self.completions.clone();
        let sp_for_job = sync_point.clone();
        self.pool.submit(Priority::Normal, move || {
            match resolver.resolve(&name_owned) {
                Ok(def) => {
                    store.put(name_owned, def);
                    sp_for_job.signal();
                }
                Err(reason) => sp_for_job.signal_failed(JobFailed(reason)),
            }
        });

        self.pending.lock().unwrap().push(PendingLoad {
            handle,
            name: name.to_string(),
            sync_point,
        });

        handle
    }

    /// Drive the upload half of the pipeline: for every pending load whose
    /// disk job has completed, either upload to the RHI and transition to
    /// `Loaded`, or transition to `Failed`. Must run on the main thread;
    /// called once per frame.
    pub fn process_pending_loads(&self, rhi: &mut dyn Rhi) {
        let mut pending = self.pending.lock().unwrap();
        let mut still_pending = Vec::new();
        for load in pending.drain(..) {
            if !load.sync_point.signaled() {
                still_pending.push(load);
                continue;
            }

            if let Some(failure) = load.sync_point.status() {
                log::warn!("texture `{}` failed to load: {}", load.name, failure);
                self.slots.get_mut_with(load.handle.retag(), |t| {
                    t.load_state = LoadState::Failed;
                });
                continue;
            }

            match self.completions.take(&load.name) {
                Some(def) => match rhi.upload_texture(&def) {
                    Ok(image) => {
                        self.slots.get_mut_with(load.handle.retag(), |t| {
                            t.width = def.width;
                            t.height = def.height;
                            t.channels = def.channels;
                            t.has_transparency = def.has_transparency;
                            t.backend_image = Some(image);
                            t.load_state = LoadState::Loaded;
                        });
                    }
                    Err(BackendFatal(reason)) => {
                        log::error!("texture `{}` upload failed: {}", load.name, reason);
                        self.slots.get_mut_with(load.handle.retag(), |t| {
                            t.load_state = LoadState::Failed;
                        });
                    }
                },
                None => still_pending.push(load),
            }
        }
        *pending = still_pending;
    }

    /// Returns the live texture, the error checker on `Failed`, the
    /// per-use placeholder while still `Loading` (§4.5), or `None` if the
    /// handle doesn't resolve at all.
    pub fn get_pointer_for(&self, handle: TextureHandle) -> Option<impl std::ops::Deref<Target = Texture> + '_> {
        match self.slots.get(handle.retag()) {
            Some(texture) if texture.load_state == LoadState::Loaded => Some(texture),
            Some(texture) if texture.load_state == LoadState::Failed => {
                drop(texture);
                self.slots.get(self.error_texture.retag())
            }
            Some(texture) if texture.load_state == LoadState::Loading => {
                let placeholder = self.placeholder_for(texture.texture_use);
                drop(texture);
                self.slots.get(placeholder.retag())
            }
            Some(_) => None,
            None => None,
        }
    }

    pub fn release(&self, handle: TextureHandle) -> bool {
        self.slots.release(handle.retag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rhi::NullRhi;

    struct StaticResolver;
    impl TextureResolver for StaticResolver {
        fn resolve(&self, _name: &str) -> Result<TextureDefinition, String> {
            Ok(TextureDefinition {
                width: 4,
                height: 4,
                channels: 4,
                has_transparency: false,
                pixels: vec![0; 64],
            })
        }
    }

    struct FailingResolver;
    impl TextureResolver for FailingResolver {
        fn resolve(&self, _name: &str) -> Result<TextureDefinition, String> {
            Err("file not found".to_string())
        }
    }

    #[test]
    fn loading_then_uploaded_transitions_to_loaded() {
        let pool = Arc::new(WorkerPool::new_inline());
        let system = TextureSystem::new(8, pool);
        let mut rhi = NullRhi::new();

        let handle = system.get_handle_for("rock.png", TextureUse::Diffuse, Arc::new(StaticResolver));
        let placeholder = system.get_pointer_for(handle).expect("loading placeholder");
        assert_eq!(placeholder.name, "__error_texture");
        drop(placeholder);

        system.process_pending_loads(&mut rhi);
        let texture = system.get_pointer_for(handle).expect("loaded");
        assert_eq!(texture.width, 4);
    }

    #[test]
    fn loading_normal_and_specular_textures_get_distinct_placeholders() {
        let pool = Arc::new(WorkerPool::new_inline());
        let system = TextureSystem::new(8, pool);

        let normal = system.get_handle_for("brick_n.png", TextureUse::Normal, Arc::new(StaticResolver));
        let specular = system.get_handle_for("brick_s.png", TextureUse::Specular, Arc::new(StaticResolver));

        assert_eq!(system.get_pointer_for(normal).unwrap().name, "__placeholder_normal");
        assert_eq!(system.get_pointer_for(specular).unwrap().name, "__placeholder_specular");
    }

    #[test]
    fn failed_disk_job_falls_back_to_error_texture() {
        let pool = Arc::new(WorkerPool::new_inline());
        let system = TextureSystem::new(8, pool);
        let mut rhi = NullRhi::new();

        let handle = system.get_handle_for("missing.png", TextureUse::Diffuse, Arc::new(FailingResolver));
        system.process_pending_loads(&mut rhi);
        let texture = system.get_pointer_for(handle).expect("fallback");
        assert_eq!(texture.name, "__error_texture");
    }

    #[test]
    fn default_textures_carry_visible_pixel_content() {
        let pool = Arc::new(WorkerPool::new_inline());
        let system = TextureSystem::new(8, pool);
        let error = system.get_pointer_for(system.error_texture).unwrap();
        assert!(!error.pixels.is_empty());
        assert!(error.pixels.chunks(4).any(|p| p == MAGENTA));
        assert!(error.pixels.chunks(4).any(|p| p == WHITE));
    }
}
