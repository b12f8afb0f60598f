// # MaxMind Geo Database
//
// This crate provides the `GeoDatabase` backed by a MaxMind MMDB file
// (GeoLite2-City or GeoLite2-Country).
//
// ## Architecture
//
// The whole file is read into memory once and wrapped in a
// `maxminddb::Reader`. Lookups are synchronous reads on that buffer, so
// one handle is shared across every concurrent resolution.
//
// Country databases decode through the City schema as well; the fields a
// Country record lacks simply stay empty.

use exitgeo_core::traits::{GeoDatabase, GeoLookup};
use exitgeo_core::{Error, Result};

use maxminddb::{Reader, geoip2};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

/// Directories searched by [`MaxMindDatabase::open_default`], in order
pub const SEARCH_DIRS: &[&str] = &["./assets", "/usr/share/GeoIP", "/var/lib/GeoIP"];

/// File names searched in each directory, in order
pub const SEARCH_FILES: &[&str] = &["GeoLite2-City.mmdb", "GeoLite2-Country.mmdb"];

/// MaxMind MMDB reader
pub struct MaxMindDatabase {
    reader: Reader<Vec<u8>>,
    source: String,
}

impl MaxMindDatabase {
    /// Open a database file
    ///
    /// # Errors
    ///
    /// - `Error::Io` if the file cannot be read
    /// - `Error::Database` if it is not a valid MMDB file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let database = Self::from_bytes(bytes, path.display().to_string())?;

        tracing::info!("Opened geo database {}", database.describe());
        Ok(database)
    }

    /// Wrap an in-memory MMDB image
    pub fn from_bytes(bytes: Vec<u8>, source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let reader = Reader::from_source(bytes)
            .map_err(|e| Error::database(format!("{}: {}", source, e)))?;

        Ok(Self { reader, source })
    }

    /// Open the first database found in the standard locations
    ///
    /// City databases are preferred over Country databases within each
    /// directory.
    pub fn open_default() -> Result<Self> {
        let dirs: Vec<PathBuf> = SEARCH_DIRS.iter().map(PathBuf::from).collect();
        Self::open_first(&dirs)
    }

    /// Open the first database found under `dirs`
    pub fn open_first(dirs: &[PathBuf]) -> Result<Self> {
        let candidates = candidates(dirs);
        let Some(path) = candidates.iter().find(|p| p.is_file()) else {
            return Err(Error::DatabaseUnavailable);
        };

        Self::open(path)
    }

    /// Schema reported by the file (`GeoLite2-City`, `GeoLite2-Country`, ...)
    pub fn database_type(&self) -> &str {
        &self.reader.metadata.database_type
    }
}

/// Every path `open_first` would try, in order
pub fn candidates(dirs: &[PathBuf]) -> Vec<PathBuf> {
    dirs.iter()
        .flat_map(|dir| SEARCH_FILES.iter().map(move |file| dir.join(file)))
        .collect()
}

fn owned(value: Option<&str>) -> String {
    value.map(str::to_string).unwrap_or_default()
}

impl GeoDatabase for MaxMindDatabase {
    fn lookup(&self, ip: IpAddr) -> Result<Option<GeoLookup>> {
        let result = self
            .reader
            .lookup(ip)
            .map_err(|e| Error::database(format!("lookup {}: {}", ip, e)))?;

        if !result.has_data() {
            return Ok(None);
        }

        let Some(city) = result
            .decode::<geoip2::City>()
            .map_err(|e| Error::database(format!("decode {}: {}", ip, e)))?
        else {
            return Ok(None);
        };

        let subdivision = city.subdivisions.first();

        Ok(Some(GeoLookup {
            country_code: owned(city.country.iso_code),
            country_name: owned(city.country.names.english),
            continent_code: owned(city.continent.code),
            region: owned(subdivision.and_then(|s| s.names.english)),
            region_code: owned(subdivision.and_then(|s| s.iso_code)),
            city: owned(city.city.names.english),
            postal_code: owned(city.postal.code),
            latitude: city.location.latitude,
            longitude: city.location.longitude,
            time_zone: owned(city.location.time_zone),
        }))
    }

    fn describe(&self) -> String {
        format!("{} ({})", self.source, self.database_type())
    }
}
