use crate::ancillary::bracket::{parse_file_time, Bracket};
use crate::ancillary::download::{FallbackFetcher, OceanDataFetcher};
use crate::ancillary::format::{AncillaryDataSpec, AncillaryVariable};
use crate::ancillary::grid::AncillaryGrid;
use crate::ancillary::interpolator::SpatiotemporalInterpolator;
use crate::ancillary::reader::AncillaryRasterReader;
use crate::ancillary::repository::AncillaryRepository;
use crate::config::ProcessorConfig;
use crate::types::{AcError, AcResult, Mjd};
use ndarray::Array2;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, OnceLock, RwLock};

/// Where the values of one variable come from, highest priority first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverMode {
    /// Pre-collocated per-pixel raster
    Raster,
    /// Bracketed files from a local archive, downloaded on demand
    Dynamic,
    /// Two supplied products with their own timestamps
    Static,
    /// Fixed default value
    Constant,
}

/// One supplied ancillary product for static mode
#[derive(Debug, Clone)]
pub struct StaticProduct {
    pub grid: AncillaryGrid,
    /// File name, used for the timestamp when the grid carries none
    pub name: String,
}

impl StaticProduct {
    pub fn new(grid: AncillaryGrid, name: impl Into<String>) -> Self {
        Self {
            grid,
            name: name.into(),
        }
    }

    /// Read a product file through `reader`
    pub fn read(reader: &dyn AncillaryRasterReader, path: &Path, spec: &AncillaryDataSpec) -> AcResult<Self> {
        let grid = reader.read_grid(path, &spec.band_names)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        Ok(Self { grid, name })
    }

    /// Product time shifted by the policy phase
    fn time(&self, spec: &AncillaryDataSpec) -> AcResult<Mjd> {
        let nominal = match self.grid.time_mjd {
            Some(time) => time,
            None => parse_file_time(&self.name)?,
        };
        Ok(nominal + spec.policy.phase)
    }
}

type BracketSlot = Arc<OnceLock<Option<Arc<SpatiotemporalInterpolator>>>>;

#[derive(Debug)]
enum VariableSource {
    Constant,
    Static(Arc<SpatiotemporalInterpolator>),
    Dynamic(Arc<AncillaryRepository>),
}

#[derive(Debug)]
struct VariableResolver {
    spec: AncillaryDataSpec,
    raster: Option<Array2<f32>>,
    source: VariableSource,
    brackets: RwLock<HashMap<i64, BracketSlot>>,
}

impl VariableResolver {
    fn mode(&self) -> ResolverMode {
        if self.raster.is_some() {
            return ResolverMode::Raster;
        }
        match self.source {
            VariableSource::Constant => ResolverMode::Constant,
            VariableSource::Static(_) => ResolverMode::Static,
            VariableSource::Dynamic(_) => ResolverMode::Dynamic,
        }
    }

    fn resolve(&self, time: Mjd, lat: f64, lon: f64) -> f64 {
        let default = self.spec.default_value;
        if !(time.is_finite() && lat.is_finite() && lon.is_finite()) {
            return default;
        }
        let value = match &self.source {
            VariableSource::Constant => default,
            VariableSource::Static(interpolator) => interpolator.value(time, lat, lon),
            VariableSource::Dynamic(repository) => {
                let bracket = self.spec.policy.bracket(time);
                match self.interpolator(repository, &bracket) {
                    Some(interpolator) => interpolator.value(time, lat, lon),
                    None => default,
                }
            }
        };
        if value.is_finite() {
            value
        } else {
            default
        }
    }

    fn resolve_pixel(&self, x: usize, y: usize, time: Mjd, lat: f64, lon: f64) -> f64 {
        if let Some(raster) = &self.raster {
            if let Some(&value) = raster.get((y, x)) {
                if value.is_finite() {
                    return value as f64;
                }
            }
        }
        self.resolve(time, lat, lon)
    }

    /// Interpolator for a bracket, loaded at most once
    fn interpolator(
        &self,
        repository: &AncillaryRepository,
        bracket: &Bracket,
    ) -> Option<Arc<SpatiotemporalInterpolator>> {
        let key = bracket.key();
        let existing = self
            .brackets
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&key)
            .cloned();
        let slot = match existing {
            Some(slot) => slot,
            None => {
                let mut map = self.brackets.write().unwrap_or_else(|poisoned| poisoned.into_inner());
                Arc::clone(map.entry(key).or_default())
            }
        };
        slot.get_or_init(|| self.load_bracket(repository, bracket)).clone()
    }

    fn load_bracket(
        &self,
        repository: &AncillaryRepository,
        bracket: &Bracket,
    ) -> Option<Arc<SpatiotemporalInterpolator>> {
        let name = self.spec.variable.name();
        log::debug!(
            "Loading {} bracket [{:.4}, {:.4})",
            name,
            bracket.start_mjd,
            bracket.end_mjd
        );
        let loaded = repository
            .load_grid(&self.spec, bracket.start_file_mjd)
            .and_then(|start| {
                let end = repository.load_grid(&self.spec, bracket.end_file_mjd)?;
                SpatiotemporalInterpolator::new(
                    start,
                    end,
                    bracket.start_mjd,
                    bracket.end_mjd,
                    self.spec.default_value,
                )
            });
        match loaded {
            Ok(interpolator) => Some(Arc::new(interpolator)),
            Err(e) => {
                log::warn!(
                    "No {} data for [{:.4}, {:.4}), using default {}: {}",
                    name,
                    bracket.start_mjd,
                    bracket.end_mjd,
                    self.spec.default_value,
                    e
                );
                None
            }
        }
    }

    fn prefetch(&self, start: Mjd, end: Mjd) -> usize {
        let VariableSource::Dynamic(repository) = &self.source else {
            return 0;
        };
        self.spec
            .policy
            .brackets_between(start, end)
            .iter()
            .filter(|bracket| self.interpolator(repository, bracket).is_some())
            .count()
    }

    fn dispose(&self) {
        self.brackets
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
        if let VariableSource::Dynamic(repository) = &self.source {
            repository.clear();
        }
    }

    fn cached_bracket_count(&self) -> usize {
        self.brackets
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

/// Resolves ozone and surface pressure for a time and position.
///
/// Shared by all workers. Dynamic sources cache one interpolator per
/// bracket; failures are cached too, so a missing bracket is requested once
/// and then answered with the default.
#[derive(Debug)]
pub struct AncillaryResolver {
    ozone: VariableResolver,
    pressure: VariableResolver,
}

impl AncillaryResolver {
    pub fn builder() -> AncillaryResolverBuilder {
        AncillaryResolverBuilder::default()
    }

    /// Constant defaults, or the configured auxdata archive with optional downloads
    pub fn from_config(config: &ProcessorConfig, reader: Arc<dyn AncillaryRasterReader>) -> AcResult<Self> {
        let mut builder = Self::builder()
            .ozone_spec(AncillaryDataSpec::ozone(config.ozone))
            .pressure_spec(AncillaryDataSpec::pressure(config.surface_pressure));

        if let Some(path) = &config.atmospheric_auxdata_path {
            let mut repository = AncillaryRepository::new(path, reader);
            if config.download_ancillary {
                let chain = FallbackFetcher::new().with(OceanDataFetcher::default());
                repository = repository.with_fetcher(Arc::new(chain));
            }
            builder = builder.repository(Arc::new(repository));
        }
        builder.build()
    }

    fn variable(&self, variable: AncillaryVariable) -> &VariableResolver {
        match variable {
            AncillaryVariable::Ozone => &self.ozone,
            AncillaryVariable::SurfacePressure => &self.pressure,
        }
    }

    pub fn mode(&self, variable: AncillaryVariable) -> ResolverMode {
        self.variable(variable).mode()
    }

    pub fn spec(&self, variable: AncillaryVariable) -> &AncillaryDataSpec {
        &self.variable(variable).spec
    }

    /// Value of `variable` at a time and position; the default when no data is available
    pub fn resolve(&self, variable: AncillaryVariable, time: Mjd, lat: f64, lon: f64) -> f64 {
        self.variable(variable).resolve(time, lat, lon)
    }

    /// Like [`resolve`](Self::resolve), preferring a per-pixel raster at (x, y)
    pub fn resolve_pixel(
        &self,
        variable: AncillaryVariable,
        x: usize,
        y: usize,
        time: Mjd,
        lat: f64,
        lon: f64,
    ) -> f64 {
        self.variable(variable).resolve_pixel(x, y, time, lat, lon)
    }

    pub fn ozone(&self, time: Mjd, lat: f64, lon: f64) -> f64 {
        self.resolve(AncillaryVariable::Ozone, time, lat, lon)
    }

    pub fn surface_pressure(&self, time: Mjd, lat: f64, lon: f64) -> f64 {
        self.resolve(AncillaryVariable::SurfacePressure, time, lat, lon)
    }

    /// Load every bracket overlapping `[start, end]` ahead of pixel processing.
    /// Returns the number of brackets with data.
    pub fn prefetch(&self, start: Mjd, end: Mjd) -> usize {
        let loaded = self.ozone.prefetch(start, end) + self.pressure.prefetch(start, end);
        log::info!("Prefetched {} ancillary brackets for [{:.5}, {:.5}]", loaded, start, end);
        loaded
    }

    pub fn cached_bracket_count(&self) -> usize {
        self.ozone.cached_bracket_count() + self.pressure.cached_bracket_count()
    }

    /// Drop all cached interpolators and grids
    pub fn dispose(&self) {
        self.ozone.dispose();
        self.pressure.dispose();
    }
}

/// Collects sources per variable; priority is raster, dynamic, static, constant.
///
/// An archive takes over from supplied static products once it is set.
#[derive(Debug, Default)]
pub struct AncillaryResolverBuilder {
    ozone_spec: Option<AncillaryDataSpec>,
    pressure_spec: Option<AncillaryDataSpec>,
    ozone_raster: Option<Array2<f32>>,
    pressure_raster: Option<Array2<f32>>,
    ozone_static: Option<(StaticProduct, StaticProduct)>,
    pressure_static: Option<(StaticProduct, StaticProduct)>,
    repository: Option<Arc<AncillaryRepository>>,
}

impl AncillaryResolverBuilder {
    pub fn ozone_spec(mut self, spec: AncillaryDataSpec) -> Self {
        self.ozone_spec = Some(spec);
        self
    }

    pub fn pressure_spec(mut self, spec: AncillaryDataSpec) -> Self {
        self.pressure_spec = Some(spec);
        self
    }

    pub fn ozone_raster(mut self, raster: Array2<f32>) -> Self {
        self.ozone_raster = Some(raster);
        self
    }

    pub fn pressure_raster(mut self, raster: Array2<f32>) -> Self {
        self.pressure_raster = Some(raster);
        self
    }

    pub fn ozone_static(mut self, start: StaticProduct, end: StaticProduct) -> Self {
        self.ozone_static = Some((start, end));
        self
    }

    pub fn pressure_static(mut self, start: StaticProduct, end: StaticProduct) -> Self {
        self.pressure_static = Some((start, end));
        self
    }

    /// Archive used by both variables in dynamic mode
    pub fn repository(mut self, repository: Arc<AncillaryRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn build(self) -> AcResult<AncillaryResolver> {
        let ozone = build_variable(
            self.ozone_spec.unwrap_or_else(|| AncillaryDataSpec::ozone(crate::config::DEFAULT_OZONE)),
            self.ozone_raster,
            self.ozone_static,
            self.repository.clone(),
        )?;
        let pressure = build_variable(
            self.pressure_spec
                .unwrap_or_else(|| AncillaryDataSpec::pressure(crate::config::DEFAULT_SURFACE_PRESSURE)),
            self.pressure_raster,
            self.pressure_static,
            self.repository,
        )?;
        Ok(AncillaryResolver { ozone, pressure })
    }
}

fn build_variable(
    spec: AncillaryDataSpec,
    raster: Option<Array2<f32>>,
    static_pair: Option<(StaticProduct, StaticProduct)>,
    repository: Option<Arc<AncillaryRepository>>,
) -> AcResult<VariableResolver> {
    let name = spec.variable.name();

    let source = if let Some(repository) = repository {
        if static_pair.is_some() {
            log::warn!("Ignoring static {} products, an ancillary archive is configured", name);
        }
        VariableSource::Dynamic(repository)
    } else if let Some((start, end)) = static_pair {
        let start_mjd = start.time(&spec)?;
        let end_mjd = end.time(&spec)?;
        let interpolator = SpatiotemporalInterpolator::new(
            Arc::new(start.grid),
            Arc::new(end.grid),
            start_mjd,
            end_mjd,
            spec.default_value,
        )
        .map_err(|e| AcError::Configuration(format!("static {} products: {}", name, e)))?;
        VariableSource::Static(Arc::new(interpolator))
    } else {
        VariableSource::Constant
    };

    if matches!(source, VariableSource::Constant) && raster.is_none() && !spec.default_value.is_finite() {
        return Err(AcError::Configuration(format!(
            "{} has neither a default value nor a data source",
            name
        )));
    }

    let resolver = VariableResolver {
        spec,
        raster,
        source,
        brackets: RwLock::new(HashMap::new()),
    };
    log::info!("Resolving {} in {:?} mode", name, resolver.mode());
    Ok(resolver)
}
