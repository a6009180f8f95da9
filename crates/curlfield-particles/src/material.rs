//! Shader materials, looked up by name.
//!
//! A [`MaterialTable`] is built once at startup and handed to whoever creates
//! pipelines. Each entry maps a name to a constructor of its shader module;
//! there is no process-wide registry.

use std::collections::BTreeMap;

use crate::error::FieldError;

/// Builds a shader module on the given device.
pub type MaterialCtor = fn(&wgpu::Device) -> wgpu::ShaderModule;

pub const SIMULATION: &str = "simulation";
pub const CONSTANT: &str = "constant";
pub const POINTS: &str = "points";

pub struct MaterialTable {
    entries: BTreeMap<String, MaterialCtor>,
}

impl MaterialTable {
    /// Empty table.
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Table holding the built-in materials: `simulation`, `constant` and `points`.
    pub fn with_builtins() -> Self {
        let mut table = Self::empty();
        table.register(SIMULATION, simulation_module);
        table.register(CONSTANT, constant_module);
        table.register(POINTS, points_module);
        table
    }

    /// Adds or replaces an entry. Returns the previous constructor, if any.
    pub fn register(&mut self, name: impl Into<String>, ctor: MaterialCtor) -> Option<MaterialCtor> {
        self.entries.insert(name.into(), ctor)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Compiles the named material.
    pub fn create(&self, device: &wgpu::Device, name: &str) -> Result<wgpu::ShaderModule, FieldError> {
        let ctor = self
            .entries
            .get(name)
            .ok_or_else(|| FieldError::UnknownMaterial(name.to_owned()))?;
        log::debug!("compiling material `{name}`");
        Ok(ctor(device))
    }
}

impl Default for MaterialTable {
    fn default() -> Self {
        Self::with_builtins()
    }
}

fn simulation_module(device: &wgpu::Device) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("curlfield simulation shader"),
        source: wgpu::ShaderSource::Wgsl(
            concat!(
                include_str!("shaders/noise.wgsl"),
                "\n",
                include_str!("shaders/simulation.wgsl")
            )
            .into(),
        ),
    })
}

fn constant_module(device: &wgpu::Device) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("curlfield constant shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shaders/constant.wgsl").into()),
    })
}

fn points_module(device: &wgpu::Device) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("curlfield points shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shaders/points.wgsl").into()),
    })
}
