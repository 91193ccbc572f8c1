//! Constraint resolution
//!
//! Turns user-level tokens (series name, memory size, region) into
//! DigitalOcean ids. Size and region come from static tables; the image is
//! looked up once per resolution from the provider's image list.

use juju_docean_cloud::{CloudProvider, Image};
use juju_docean_config::ConfigError;

use crate::error::Result;

/// Size used when the constraints do not mention memory
pub const DEFAULT_SIZE: &str = "512mb";

/// Region used when the constraints do not mention one
pub const DEFAULT_REGION: &str = "nyc2";

/// Droplet size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub id: u64,
    pub name: &'static str,
    pub memory_mb: u64,
}

impl Size {
    const fn new(id: u64, name: &'static str, memory_mb: u64) -> Self {
        Self {
            id,
            name,
            memory_mb,
        }
    }
}

/// Droplet region; the first alias is the region slug
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionEntry {
    pub id: u64,
    pub name: &'static str,
    pub aliases: &'static [&'static str],
}

impl RegionEntry {
    const fn new(id: u64, name: &'static str, aliases: &'static [&'static str]) -> Self {
        Self { id, name, aliases }
    }

    pub fn slug(&self) -> &'static str {
        self.aliases[0]
    }
}

pub const SIZES: &[Size] = &[
    Size::new(66, "512MB", 512),
    Size::new(63, "1GB", 1024),
    Size::new(62, "2GB", 2048),
    Size::new(64, "4GB", 4096),
    Size::new(65, "8GB", 8192),
    Size::new(61, "16GB", 16384),
    Size::new(60, "32GB", 32768),
    Size::new(70, "48GB", 49152),
    Size::new(69, "64GB", 65536),
];

pub const REGIONS: &[RegionEntry] = &[
    RegionEntry::new(1, "New York 1", &["nyc1", "nyc"]),
    RegionEntry::new(2, "Amsterdam 1", &["ams1"]),
    RegionEntry::new(3, "San Francisco 1", &["sfo1", "sfo"]),
    RegionEntry::new(4, "New York 2", &["nyc2"]),
    RegionEntry::new(5, "Amsterdam 2", &["ams2", "ams"]),
    RegionEntry::new(6, "Singapore 1", &["sgp1", "sgp"]),
    RegionEntry::new(7, "London 1", &["lon1", "lon"]),
    RegionEntry::new(8, "New York 3", &["nyc3"]),
];

/// Ubuntu series name to release version
pub const SERIES: &[(&str, &str)] = &[("precise", "12.04"), ("trusty", "14.04")];

/// Series names known to the tables, sorted
pub fn series_names() -> Vec<String> {
    let mut names: Vec<String> = SERIES.iter().map(|(s, _)| s.to_string()).collect();
    names.sort();
    names
}

pub fn size_by_id(id: u64) -> Option<&'static Size> {
    SIZES.iter().find(|s| s.id == id)
}

pub fn region_by_id(id: u64) -> Option<&'static RegionEntry> {
    REGIONS.iter().find(|r| r.id == id)
}

fn series_version(series: &str) -> Option<&'static str> {
    SERIES
        .iter()
        .find(|(name, _)| *name == series)
        .map(|(_, version)| *version)
}

/// Memory in MB for tokens like `512`, `512m`, `512mb`, `2g`, `2G`, `2gb`
fn parse_memory_mb(token: &str) -> Option<u64> {
    let token = token.trim().to_ascii_lowercase();
    let token = token.strip_suffix('b').unwrap_or(&token);
    let (number, factor) = if let Some(n) = token.strip_suffix('g') {
        (n, 1024.0)
    } else if let Some(n) = token.strip_suffix('m') {
        (n, 1.0)
    } else {
        (token, 1.0)
    };
    let value: f64 = number.trim().parse().ok()?;
    if !value.is_finite() || value <= 0.0 {
        return None;
    }
    Some((value * factor).round() as u64)
}

/// User-level constraint tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintSpec {
    pub series: String,
    pub size: String,
    pub region: String,
}

impl ConstraintSpec {
    pub fn new(
        series: impl Into<String>,
        size: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            series: series.into(),
            size: size.into(),
            region: region.into(),
        }
    }

    /// Parse a constraint string such as `"mem=2G, region=nyc3"`.
    ///
    /// Absent keys take the defaults; unknown keys and malformed pairs fail.
    pub fn parse(series: &str, constraints: &str) -> std::result::Result<Self, ConfigError> {
        let mut size = None;
        let mut region = None;

        for pair in constraints
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|p| !p.is_empty())
        {
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                ConfigError::InvalidConstraints(format!("expected key=value, got {:?}", pair))
            })?;
            match key {
                "mem" => size = Some(value.to_string()),
                "region" => region = Some(value.to_string()),
                other => {
                    return Err(ConfigError::InvalidConstraints(format!(
                        "unsupported constraint {:?}",
                        other
                    )));
                }
            }
        }

        Ok(Self {
            series: series.to_string(),
            size: size.unwrap_or_else(|| DEFAULT_SIZE.to_string()),
            region: region.unwrap_or_else(|| DEFAULT_REGION.to_string()),
        })
    }
}

/// Provider-native ids for a [`ConstraintSpec`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedConstraints {
    pub image_id: u64,
    pub size_id: u64,
    pub region_id: u64,
}

/// Resolve size and region from the static tables. Pure; also rejects an
/// unknown series so that table misses never reach the network.
pub fn solve_constraints(spec: &ConstraintSpec) -> std::result::Result<(u64, u64), ConfigError> {
    if series_version(&spec.series).is_none() {
        return Err(ConfigError::UnknownSeries(spec.series.clone()));
    }

    let memory = parse_memory_mb(&spec.size)
        .ok_or_else(|| ConfigError::UnknownSize(spec.size.clone()))?;
    let size = SIZES
        .iter()
        .find(|s| s.memory_mb == memory)
        .ok_or_else(|| ConfigError::UnknownSize(spec.size.clone()))?;

    let token = spec.region.trim().to_ascii_lowercase();
    let region = REGIONS
        .iter()
        .find(|r| r.aliases.contains(&token.as_str()))
        .ok_or_else(|| ConfigError::UnknownRegion(spec.region.clone()))?;

    Ok((size.id, region.id))
}

/// Provider image list, fetched once and reused for every lookup
#[derive(Debug, Clone, Default)]
pub struct ImageCatalog {
    images: Vec<Image>,
}

impl ImageCatalog {
    pub fn new(images: Vec<Image>) -> Self {
        Self { images }
    }

    pub async fn fetch(provider: &dyn CloudProvider) -> Result<Self> {
        let started = std::time::Instant::now();
        let images = provider.list_images().await?;
        tracing::debug!(
            "Looked up {} images in {:.2} seconds",
            images.len(),
            started.elapsed().as_secs_f64()
        );
        Ok(Self::new(images))
    }

    /// Ubuntu x64 image for `series`, matched by slug or by name
    pub fn image_for_series(&self, series: &str) -> std::result::Result<u64, ConfigError> {
        let version =
            series_version(series).ok_or_else(|| ConfigError::UnknownSeries(series.to_string()))?;
        let slug = format!("ubuntu-{}-x64", version.replace('.', "-"));
        let name = format!("Ubuntu {} x64", version);

        self.images
            .iter()
            .filter(|i| {
                i.slug.as_deref() == Some(slug.as_str())
                    || (i.distribution == "Ubuntu" && i.name == name)
            })
            .map(|i| i.id)
            .min()
            .ok_or_else(|| ConfigError::NoImageForSeries(series.to_string()))
    }
}

/// Full resolution: tables first, then a single image lookup
pub async fn resolve(
    provider: &dyn CloudProvider,
    spec: &ConstraintSpec,
) -> Result<ResolvedConstraints> {
    let (size_id, region_id) = solve_constraints(spec)?;
    let catalog = ImageCatalog::fetch(provider).await?;
    let image_id = catalog.image_for_series(&spec.series)?;
    Ok(ResolvedConstraints {
        image_id,
        size_id,
        region_id,
    })
}
