//! Demo configuration.
//!
//! Plain structs with sensible defaults; a handful of `SCRITH_*` environment
//! variables override them at startup.

use std::str::FromStr;

use thiserror::Error;
use winit::dpi::LogicalSize;

use crate::device::DeviceInit;

/// Window configuration.
#[derive(Debug, Clone)]
pub struct WindowConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "scrith sample".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
        }
    }
}

/// Tile floor parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneConfig {
    /// Rings around the center tile; instance count is `1 + 3R(R + 1)`.
    pub rings: u32,
    /// Circumradius of one tile in world units.
    pub tile_size: f32,
    /// Recursive centroid splits per fan triangle.
    pub subdivision: u32,
    pub wave_amplitude: f32,
    pub wave_frequency: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            rings: 16,
            tile_size: 1.0,
            subdivision: 1,
            wave_amplitude: 0.35,
            wave_frequency: 0.8,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub window: WindowConfig,
    pub device: DeviceInit,
    pub scene: SceneConfig,
    /// Run the compute post-process over each frame.
    pub post_processing: bool,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            device: DeviceInit::default(),
            scene: SceneConfig::default(),
            post_processing: true,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: cannot parse `{value}`")]
    Invalid { var: &'static str, value: String },

    #[error("{var}: {value} is outside {min}..={max}")]
    OutOfRange {
        var: &'static str,
        value: String,
        min: String,
        max: String,
    },
}

const MAX_RINGS: u32 = 128;
const MAX_SUBDIVISION: u32 = 4;

impl DemoConfig {
    /// Defaults overridden from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overridden through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = DemoConfig::default();

        if let Some(v) = parse::<u32>(&lookup, "SCRITH_RINGS")? {
            cfg.scene.rings = in_range("SCRITH_RINGS", v, 0, MAX_RINGS)?;
        }
        if let Some(v) = parse::<f32>(&lookup, "SCRITH_TILE_SIZE")? {
            cfg.scene.tile_size = in_range("SCRITH_TILE_SIZE", v, 0.01, 100.0)?;
        }
        if let Some(v) = parse::<u32>(&lookup, "SCRITH_SUBDIVISION")? {
            cfg.scene.subdivision = in_range("SCRITH_SUBDIVISION", v, 0, MAX_SUBDIVISION)?;
        }
        if let Some(v) = flag(&lookup, "SCRITH_POST")? {
            cfg.post_processing = v;
        }
        if let Some(v) = flag(&lookup, "SCRITH_RAY_TRACING")? {
            cfg.device.ray_tracing = v;
        }
        if let Some(v) = flag(&lookup, "SCRITH_MSAA")? {
            cfg.device.msaa_4x = v;
        }
        if let Some(v) = flag(&lookup, "SCRITH_VSYNC")? {
            cfg.device.present_mode = if v {
                wgpu::PresentMode::Fifo
            } else {
                wgpu::PresentMode::AutoNoVsync
            };
        }

        Ok(cfg)
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<T>()
        .map(Some)
        .map_err(|_| ConfigError::Invalid { var, value: raw })
}

fn flag(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<bool>, ConfigError> {
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(Some(true)),
        "0" | "false" | "off" | "no" => Ok(Some(false)),
        _ => Err(ConfigError::Invalid { var, value: raw }),
    }
}

fn in_range<T>(var: &'static str, v: T, min: T, max: T) -> Result<T, ConfigError>
where
    T: PartialOrd + ToString,
{
    if v < min || v > max {
        return Err(ConfigError::OutOfRange {
            var,
            value: v.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        });
    }
    Ok(v)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let cfg = DemoConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.scene, SceneConfig::default());
        assert!(cfg.post_processing);
        assert!(!cfg.device.ray_tracing);
        assert_eq!(cfg.window.title, "scrith sample");
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = DemoConfig::from_lookup(lookup(&[
            ("SCRITH_RINGS", "48"),
            ("SCRITH_POST", "off"),
            ("SCRITH_RAY_TRACING", "1"),
            ("SCRITH_VSYNC", "false"),
        ]))
        .unwrap();
        assert_eq!(cfg.scene.rings, 48);
        assert!(!cfg.post_processing);
        assert!(cfg.device.ray_tracing);
        assert_eq!(cfg.device.present_mode, wgpu::PresentMode::AutoNoVsync);
    }

    #[test]
    fn garbage_is_rejected() {
        let err = DemoConfig::from_lookup(lookup(&[("SCRITH_MSAA", "maybe")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid { var: "SCRITH_MSAA", value: "maybe".into() }
        );
        assert!(DemoConfig::from_lookup(lookup(&[("SCRITH_RINGS", "-3")])).is_err());
    }

    #[test]
    fn out_of_range_is_rejected() {
        let err = DemoConfig::from_lookup(lookup(&[("SCRITH_SUBDIVISION", "9")])).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { var: "SCRITH_SUBDIVISION", .. }));
    }
}
