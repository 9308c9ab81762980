use crate::ancillary::bracket::{file_prefix, is_valid_file_name, mjd_to_datetime};
use crate::ancillary::download::AncillaryFetcher;
use crate::ancillary::format::AncillaryDataSpec;
use crate::ancillary::grid::AncillaryGrid;
use crate::ancillary::reader::AncillaryRasterReader;
use crate::types::{AcError, AcResult, Mjd};
use chrono::Datelike;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Local archive of ancillary files laid out as `<root>/<yyyy>/<ddd>/<name>`.
///
/// Files missing locally are requested from the fetch strategy, when one is
/// configured. Grids are read once and shared between the brackets that
/// use them.
#[derive(Debug)]
pub struct AncillaryRepository {
    root: PathBuf,
    reader: Arc<dyn AncillaryRasterReader>,
    fetcher: Option<Arc<dyn AncillaryFetcher>>,
    grids: RwLock<HashMap<PathBuf, Arc<AncillaryGrid>>>,
}

impl AncillaryRepository {
    pub fn new<P: AsRef<Path>>(root: P, reader: Arc<dyn AncillaryRasterReader>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            reader,
            fetcher: None,
            grids: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn AncillaryFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the files of one nominal file time
    pub fn file_dir(&self, file_mjd: Mjd) -> AcResult<PathBuf> {
        let time = mjd_to_datetime(file_mjd)?;
        Ok(self
            .root
            .join(format!("{:04}", time.year()))
            .join(format!("{:03}", time.ordinal())))
    }

    /// First candidate file present in the local archive
    pub fn find_local(&self, spec: &AncillaryDataSpec, file_mjd: Mjd) -> AcResult<Option<PathBuf>> {
        let prefix = file_prefix(file_mjd)?;
        let dir = self.file_dir(file_mjd)?;
        Ok(spec
            .file_names(&prefix)
            .into_iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file()))
    }

    /// Locate, fetch if needed, and read the grid valid at `file_mjd`
    pub fn load_grid(&self, spec: &AncillaryDataSpec, file_mjd: Mjd) -> AcResult<Arc<AncillaryGrid>> {
        let path = self.locate(spec, file_mjd)?;

        if let Some(grid) = self.read_cache().get(&path) {
            return Ok(Arc::clone(grid));
        }

        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if !is_valid_file_name(name) {
            return Err(AcError::InvalidFormat(format!("not an ancillary file name: {}", name)));
        }

        log::info!("Reading {} from {}", spec.variable.name(), path.display());
        let grid = Arc::new(self.reader.read_grid(&path, &spec.band_names)?);
        self.write_cache().insert(path, Arc::clone(&grid));
        Ok(grid)
    }

    /// Release all grids read so far
    pub fn clear(&self) {
        self.write_cache().clear();
    }

    pub fn cached_grid_count(&self) -> usize {
        self.read_cache().len()
    }

    fn locate(&self, spec: &AncillaryDataSpec, file_mjd: Mjd) -> AcResult<PathBuf> {
        if let Some(path) = self.find_local(spec, file_mjd)? {
            log::debug!("Ancillary cache hit: {}", path.display());
            return Ok(path);
        }

        let prefix = file_prefix(file_mjd)?;
        let fetcher = self.fetcher.as_ref().ok_or_else(|| {
            AcError::AuxDataUnavailable(format!("{} not in {} and downloads are disabled", prefix, self.root.display()))
        })?;

        let dir = self.file_dir(file_mjd)?;
        log::info!("Fetching {} ancillary file {}", spec.variable.name(), prefix);
        fetcher.fetch(&prefix, &spec.file_names(&prefix), &dir)
    }

    fn read_cache(&self) -> std::sync::RwLockReadGuard<'_, HashMap<PathBuf, Arc<AncillaryGrid>>> {
        self.grids.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_cache(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<PathBuf, Arc<AncillaryGrid>>> {
        self.grids.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    #[derive(Debug, Default)]
    struct ConstantReader {
        reads: AtomicUsize,
    }

    impl AncillaryRasterReader for ConstantReader {
        fn read_grid(&self, _path: &Path, _band_names: &[String]) -> AcResult<AncillaryGrid> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            AncillaryGrid::global(Array2::from_elem((2, 2), 300.0))
        }
    }

    #[test]
    fn test_file_dir_layout() {
        let repo = AncillaryRepository::new("/data/aux", Arc::new(ConstantReader::default()));
        // 2015-06-22 = day 173
        let mjd = 5651.25;
        assert_eq!(repo.file_dir(mjd).unwrap(), PathBuf::from("/data/aux/2015/173"));
    }

    #[test]
    fn test_local_file_is_read_once() {
        let dir = TempDir::new().unwrap();
        let reader = Arc::new(ConstantReader::default());
        let repo = AncillaryRepository::new(dir.path(), reader.clone());
        let spec = AncillaryDataSpec::pressure(1000.0);

        let file_dir = dir.path().join("2000/001");
        std::fs::create_dir_all(&file_dir).unwrap();
        std::fs::write(file_dir.join("N200000106_MET_NCEPN_6h.hdf"), b"x").unwrap();

        let a = repo.load_grid(&spec, 0.25).unwrap();
        let b = repo.load_grid(&spec, 0.25).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(reader.reads.load(Ordering::SeqCst), 1);

        repo.clear();
        assert_eq!(repo.cached_grid_count(), 0);
    }

    #[test]
    fn test_missing_file_without_fetcher_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let repo = AncillaryRepository::new(dir.path(), Arc::new(ConstantReader::default()));
        let result = repo.load_grid(&AncillaryDataSpec::ozone(330.0), 0.0);
        assert!(matches!(result, Err(AcError::AuxDataUnavailable(_))));
    }
}
