//! CSV loading for the player pool.
//!
//! Required columns (any order, case-insensitive):
//! `id, name, position, projected_points, adp, vor`.
//!
//! Every row is validated before the pool is built, so malformed input fails
//! at load time with `DraftError::DataValidation` and the 1-based data row.

use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use tracing::info;

use super::catalog::PlayerPool;
use crate::core::{DraftError, Player, PlayerId, Position, Result};

const REQUIRED_COLUMNS: [&str; 6] = ["id", "name", "position", "projected_points", "adp", "vor"];

/// Column positions resolved from the header row.
struct Columns {
    id: usize,
    name: usize,
    position: usize,
    projected_points: usize,
    adp: usize,
    vor: usize,
}

impl Columns {
    fn resolve(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| -> Result<usize> {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| DraftError::data(0, format!("missing required column '{name}'")))
        };
        Ok(Self {
            id: find(REQUIRED_COLUMNS[0])?,
            name: find(REQUIRED_COLUMNS[1])?,
            position: find(REQUIRED_COLUMNS[2])?,
            projected_points: find(REQUIRED_COLUMNS[3])?,
            adp: find(REQUIRED_COLUMNS[4])?,
            vor: find(REQUIRED_COLUMNS[5])?,
        })
    }
}

fn field<'r>(record: &'r StringRecord, index: usize, row: usize, name: &str) -> Result<&'r str> {
    match record.get(index).map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(DraftError::data(row, format!("missing {name}"))),
    }
}

fn number(record: &StringRecord, index: usize, row: usize, name: &str) -> Result<f32> {
    let raw = field(record, index, row, name)?;
    let value: f32 = raw
        .parse()
        .map_err(|_| DraftError::data(row, format!("{name} '{raw}' is not numeric")))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(DraftError::data(row, format!("{name} '{raw}' is not finite")))
    }
}

fn parse_row(record: &StringRecord, columns: &Columns, row: usize) -> Result<Player> {
    let raw_id = field(record, columns.id, row, "id")?;
    let id: u32 = raw_id
        .parse()
        .map_err(|_| DraftError::data(row, format!("id '{raw_id}' is not a non-negative integer")))?;
    let name = field(record, columns.name, row, "name")?;
    let raw_position = record.get(columns.position).unwrap_or("");
    let position = Position::parse(raw_position)
        .ok_or_else(|| DraftError::data(row, "missing position"))?;

    Ok(Player::new(
        PlayerId::new(id),
        name,
        position,
        number(record, columns.projected_points, row, "projected_points")?,
        number(record, columns.adp, row, "adp")?,
        number(record, columns.vor, row, "vor")?,
    ))
}

/// Load a pool from any CSV reader.
pub fn load_pool_from_reader<R: Read>(reader: R) -> Result<PlayerPool> {
    let mut csv = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = csv.headers()?.clone();
    let columns = Columns::resolve(&headers)?;

    let mut players = Vec::new();
    for (i, record) in csv.records().enumerate() {
        let record = record?;
        players.push(parse_row(&record, &columns, i + 1)?);
    }
    PlayerPool::new(players)
}

/// Load a pool from a CSV file.
pub fn load_pool<P: AsRef<Path>>(path: P) -> Result<PlayerPool> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let pool = load_pool_from_reader(file)?;
    info!(path = %path.display(), players = pool.len(), "loaded player pool");
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "id,name,position,projected_points,adp,vor\n";

    #[test]
    fn test_load_valid() {
        let data = format!("{HEADER}1,Alpha,QB,320.5,4.0,80\n2,Beta,WR1,250,2.5,60\n3,Gamma,K,120,150,0\n");
        let pool = load_pool_from_reader(data.as_bytes()).unwrap();

        assert_eq!(pool.len(), 3);
        let beta = pool.get(PlayerId::new(2)).unwrap();
        assert_eq!(beta.position, Position::WR);
        assert_eq!(beta.projected_points, 250.0);
        assert_eq!(pool.get(PlayerId::new(3)).unwrap().position, Position::Other);
    }

    #[test]
    fn test_column_order_and_case() {
        let data = "VOR,Name,ADP,Projected_Points,Position,ID\n10,Alpha,3,200,RB,7\n";
        let pool = load_pool_from_reader(data.as_bytes()).unwrap();
        let alpha = pool.get(PlayerId::new(7)).unwrap();
        assert_eq!(alpha.vor, 10.0);
        assert_eq!(alpha.adp, 3.0);
    }

    #[test]
    fn test_missing_position_rejected() {
        let data = format!("{HEADER}1,Alpha,QB,300,1,50\n2,Beta,,200,2,40\n");
        let err = load_pool_from_reader(data.as_bytes()).unwrap_err();
        match err {
            DraftError::DataValidation { row, reason } => {
                assert_eq!(row, 2);
                assert!(reason.contains("position"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_numeric_projection_rejected() {
        let data = format!("{HEADER}1,Alpha,QB,lots,1,50\n");
        let err = load_pool_from_reader(data.as_bytes()).unwrap_err();
        assert!(matches!(err, DraftError::DataValidation { row: 1, .. }));
    }

    #[test]
    fn test_missing_column_rejected() {
        let data = "id,name,position,projected_points,adp\n1,Alpha,QB,300,1\n";
        let err = load_pool_from_reader(data.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("vor"));
    }

    #[test]
    fn test_load_from_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{HEADER}1,Alpha,TE,150,20,30\n").unwrap();
        let pool = load_pool(file.path()).unwrap();
        assert_eq!(pool.len(), 1);
    }
}
