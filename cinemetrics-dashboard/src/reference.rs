//! Reference data for the sidebar: the year slider bounds and the genre
//! list. Both are fetched at most once per local store.

use crate::service::DataService;
use crate::store::{ClientStorage, Durability};
use cinemetrics_core::{DataSource, FilterDefaults, QueryKind, YearRange};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

/// Stored year bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearBoundsPacket {
    pub min: i32,
    pub max: i32,
}

impl YearBoundsPacket {
    fn is_usable(&self) -> bool {
        self.min != 0 && self.max != 0
    }
}

/// Stored genre list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GenresPacket {
    #[serde(default)]
    pub genres: Vec<String>,
}

/// One entry of the genre multi-select.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenreOption {
    pub value: String,
    pub label: String,
}

/// Whether a load reached the warehouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceLoad {
    /// The local slot already held usable data.
    Cached,
    Fetched,
}

pub struct ReferenceLoader<W: DataSource> {
    service: Arc<DataService<W>>,
    storage: Arc<ClientStorage>,
    defaults: FilterDefaults,
}

impl<W: DataSource> ReferenceLoader<W> {
    pub fn new(
        service: Arc<DataService<W>>,
        storage: Arc<ClientStorage>,
        defaults: FilterDefaults,
    ) -> Self {
        Self {
            service,
            storage,
            defaults,
        }
    }

    fn stored_year_bounds(&self) -> Option<YearBoundsPacket> {
        self.storage
            .read::<YearBoundsPacket>(Durability::Local, QueryKind::YearBounds.slot())
            .filter(YearBoundsPacket::is_usable)
    }

    fn stored_genres(&self) -> Option<GenresPacket> {
        self.storage
            .read::<GenresPacket>(Durability::Local, QueryKind::GenreCatalog.slot())
            .filter(|p| !p.genres.is_empty())
    }

    pub fn load_year_range(&self) -> ReferenceLoad {
        if self.stored_year_bounds().is_some() {
            info!("Using cached year range data");
            return ReferenceLoad::Cached;
        }
        info!("Fetching year range from database");
        let range = self.service.year_range();
        let packet = YearBoundsPacket {
            min: range.low,
            max: range.high,
        };
        if let Err(e) = self
            .storage
            .write(Durability::Local, QueryKind::YearBounds.slot(), &packet)
        {
            error!(error = %e, "Error storing year range");
        }
        ReferenceLoad::Fetched
    }

    pub fn load_genres(&self) -> ReferenceLoad {
        if self.stored_genres().is_some() {
            info!("Using cached genres data");
            return ReferenceLoad::Cached;
        }
        info!("Fetching genres from database");
        let packet = GenresPacket {
            genres: self.service.unique_genres(),
        };
        if let Err(e) = self
            .storage
            .write(Durability::Local, QueryKind::GenreCatalog.slot(), &packet)
        {
            error!(error = %e, "Error storing genres");
        }
        ReferenceLoad::Fetched
    }

    /// Bounds for the year slider, from the store or the configured range.
    pub fn year_slider_bounds(&self) -> YearRange {
        self.stored_year_bounds()
            .map(|p| YearRange::new(p.min, p.max))
            .unwrap_or_else(|| self.defaults.year_bounds())
    }

    /// Options for the genre multi-select; empty until genres are loaded.
    pub fn genre_options(&self) -> Vec<GenreOption> {
        self.stored_genres()
            .map(|p| p.genres)
            .unwrap_or_default()
            .into_iter()
            .map(|genre| GenreOption {
                value: genre.clone(),
                label: genre,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, Int64Array, StringArray};
    use arrow::record_batch::RecordBatch;
    use cinemetrics_test_utils::ScriptedSource;

    fn loader(source: ScriptedSource) -> (Arc<ClientStorage>, ReferenceLoader<ScriptedSource>) {
        let storage = Arc::new(ClientStorage::new());
        let loader = ReferenceLoader::new(
            Arc::new(DataService::new(source)),
            Arc::clone(&storage),
            FilterDefaults::default(),
        );
        (storage, loader)
    }

    fn scripted() -> ScriptedSource {
        let bounds = RecordBatch::try_from_iter([
            ("min_year", Arc::new(Int64Array::from(vec![1915])) as ArrayRef),
            ("max_year", Arc::new(Int64Array::from(vec![2024])) as ArrayRef),
        ])
        .unwrap();
        let genres = RecordBatch::try_from_iter([(
            "genre",
            Arc::new(StringArray::from(vec!["Comedy", "Drama"])) as ArrayRef,
        )])
        .unwrap();
        ScriptedSource::new()
            .with_table(QueryKind::YearBounds, bounds)
            .with_table(QueryKind::GenreCatalog, genres)
    }

    #[test]
    fn test_loads_once_per_store() {
        let (_, loader) = loader(scripted());
        assert_eq!(loader.load_year_range(), ReferenceLoad::Fetched);
        assert_eq!(loader.load_year_range(), ReferenceLoad::Cached);
        assert_eq!(loader.load_genres(), ReferenceLoad::Fetched);
        assert_eq!(loader.load_genres(), ReferenceLoad::Cached);

        let source = loader.service.warehouse();
        assert_eq!(source.call_count(QueryKind::YearBounds), 1);
        assert_eq!(source.call_count(QueryKind::GenreCatalog), 1);
    }

    #[test]
    fn test_slider_and_options() {
        let (_, loader) = loader(scripted());
        assert_eq!(loader.year_slider_bounds(), YearRange::new(1894, 2025));
        assert!(loader.genre_options().is_empty());

        loader.load_year_range();
        loader.load_genres();
        assert_eq!(loader.year_slider_bounds(), YearRange::new(1915, 2024));
        assert_eq!(
            loader.genre_options(),
            vec![
                GenreOption {
                    value: "Comedy".into(),
                    label: "Comedy".into()
                },
                GenreOption {
                    value: "Drama".into(),
                    label: "Drama".into()
                },
            ]
        );
    }

    #[test]
    fn test_survives_session_end() {
        let (storage, loader) = loader(scripted());
        loader.load_year_range();
        storage.end_session();
        assert_eq!(loader.load_year_range(), ReferenceLoad::Cached);
    }

    #[test]
    fn test_empty_genre_list_is_refetched() {
        let (_, loader) = loader(ScriptedSource::new().with_failure(QueryKind::GenreCatalog, "down"));
        assert_eq!(loader.load_genres(), ReferenceLoad::Fetched);
        assert_eq!(loader.load_genres(), ReferenceLoad::Fetched);
    }
}
