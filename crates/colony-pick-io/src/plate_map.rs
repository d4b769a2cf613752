use std::fs;
use std::path::Path;

use colony_pick_core::PlateMap;

use crate::PlateMapError;

/// Read a plate map CSV. Row `r`, field `c` names the plasmid in cell `(r, c)`.
///
/// There is no header row and rows may differ in length. Lines with no
/// characters at all are skipped, so a row of blank cells needs its commas.
pub fn read_plate_map(path: impl AsRef<Path>) -> Result<PlateMap, PlateMapError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| PlateMapError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    let rows = reader
        .records()
        .map(|record| record.map(|r| r.iter().map(str::to_owned).collect()))
        .collect::<Result<Vec<Vec<String>>, _>>()
        .map_err(|source| PlateMapError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
    let map = PlateMap::new(rows);
    let (r, c) = map.dims();
    log::debug!("plate map {}: {r} x {c}", path.display());
    Ok(map)
}

/// Source identifier of a plate: its plate-map file stem.
pub fn plate_source(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
