use serde::{Deserialize, Serialize};

/// 原生平台上指向 JSON 配置文件的环境变量
pub const OPTIONS_ENV_VAR: &str = "PORTFOLIO_OPTIONS";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraOptions {
    /// Vertical field of view in degrees.
    pub fovy: f32,
    pub znear: f32,
    pub zfar: f32,
    /// 默认取景：相机位于 (0, 0, default_distance)，看向原点
    pub default_distance: f32,
    pub damping_factor: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
}

impl Default for CameraOptions {
    fn default() -> Self {
        Self {
            fovy: 70.0,
            znear: 0.1,
            zfar: 1000.0,
            default_distance: 30.0,
            damping_factor: 0.08,
            min_distance: 12.0,
            max_distance: 60.0,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SceneOptions {
    pub node_orbit_radius: f32,
    pub star_count: usize,
    /// 星点分布立方体的边长
    pub star_spread: f32,
    pub star_seed: u64,
}

impl Default for SceneOptions {
    fn default() -> Self {
        Self {
            node_orbit_radius: 12.0,
            star_count: 8000,
            star_spread: 120.0,
            star_seed: 0x05c0_ffee,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FontOptions {
    /// TTF/OTF used for the node labels.
    pub url: String,
    /// Upper bound on the loading screen when the request never answers.
    pub timeout_secs: f32,
}

impl Default for FontOptions {
    fn default() -> Self {
        Self {
            url: "https://cdn.jsdelivr.net/fontsource/fonts/space-grotesk@latest/latin-500-normal.ttf".to_string(),
            timeout_secs: 8.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PortfolioOptions {
    pub camera: CameraOptions,
    pub scene: SceneOptions,
    pub font: FontOptions,
}

impl PortfolioOptions {
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// 原生平台读取 `PORTFOLIO_OPTIONS` 指向的文件；失败时回退到默认值
    pub fn load() -> Self {
        #[cfg(not(target_arch = "wasm32"))]
        {
            let Ok(path) = std::env::var(OPTIONS_ENV_VAR) else {
                return Self::default();
            };
            let parsed = std::fs::read_to_string(&path)
                .map_err(anyhow::Error::from)
                .and_then(|json| Self::from_json_str(&json));
            match parsed {
                Ok(options) => {
                    log::info!("Loaded options from {}", path);
                    options
                }
                Err(e) => {
                    log::warn!("Failed to load options from {}: {:#}. Using defaults.", path, e);
                    Self::default()
                }
            }
        }
        #[cfg(target_arch = "wasm32")]
        {
            Self::default()
        }
    }
}
