use crate::error::{PipelineError, Result, ResultExt as _};
use ndarray::Array2;
use polars::prelude::*;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase()
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    Ok(())
}

/// Load a CSV or Parquet file, choosing the reader by extension.
pub fn load_df(path: &Path) -> Result<DataFrame> {
    let ext = extension(path);

    let df = match ext.as_str() {
        "csv" => LazyCsvReader::new(path)
            .with_infer_schema_length(Some(10000))
            .with_has_header(true)
            .finish()?
            .collect()
            .with_context(|| format!("Failed to read CSV {}", path.display()))?,
        "parquet" => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            ParquetReader::new(file)
                .finish()
                .with_context(|| format!("Failed to read Parquet {}", path.display()))?
        }
        _ => {
            return Err(PipelineError::DataProcessing(format!(
                "Unsupported file extension '{ext}': {}",
                path.display()
            )));
        }
    };

    Ok(df)
}

/// Write `df` as CSV (header, no index) or Parquet, creating parent
/// directories and replacing any existing file.
pub fn save_df(df: &mut DataFrame, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    if extension(path) == "parquet" {
        ParquetWriter::new(file)
            .finish(df)
            .with_context(|| format!("Failed to write Parquet {}", path.display()))?;
    } else {
        CsvWriter::new(file)
            .include_header(true)
            .finish(df)
            .with_context(|| format!("Failed to write CSV {}", path.display()))?;
    }

    Ok(())
}

/// Files directly inside `dir`, sorted by name.
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list directory {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Write a numeric array as a Parquet file, one Float64 column per name.
pub fn save_array(array: &Array2<f64>, column_names: &[String], path: &Path) -> Result<()> {
    if array.ncols() != column_names.len() {
        return Err(PipelineError::DataProcessing(format!(
            "array has {} columns but {} names were given",
            array.ncols(),
            column_names.len()
        )));
    }

    let columns = column_names
        .iter()
        .zip(array.columns())
        .map(|(name, values)| Column::new(name.as_str().into(), values.to_vec()))
        .collect::<Vec<_>>();

    let mut df = DataFrame::new(columns)?;
    save_df(&mut df, path)
}

/// Load a numeric array written by [`save_array`], with its column names.
pub fn load_array(path: &Path) -> Result<(Array2<f64>, Vec<String>)> {
    let df = load_df(path)?;
    let names = df
        .get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect::<Vec<_>>();

    let mut array = Array2::<f64>::zeros((df.height(), df.width()));
    for (j, column) in df.get_columns().iter().enumerate() {
        let values = column.as_materialized_series().cast(&DataType::Float64)?;
        for (i, value) in values.f64()?.into_iter().enumerate() {
            array[[i, j]] = value.ok_or_else(|| {
                PipelineError::DataProcessing(format!(
                    "null at row {i} of column '{}' in {}",
                    names[j],
                    path.display()
                ))
            })?;
        }
    }

    Ok((array, names))
}

/// Serialize `value` as pretty JSON to `path`.
pub fn save_object<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

pub fn load_object<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Failed to deserialize {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_csv_round_trip_keeps_nulls() -> Result<()> {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("nested").join("split.csv");

        let mut df = DataFrame::new(vec![
            Column::from(Series::new("Age".into(), &[Some(30i64), None, Some(41)])),
            Column::from(Series::new("Gender".into(), &["Male", "Female", "Male"])),
        ])?;
        save_df(&mut df, &path)?;

        let loaded = load_df(&path)?;
        assert_eq!(loaded.shape(), (3, 2));
        assert_eq!(loaded.column("Age")?.null_count(), 1);
        Ok(())
    }

    #[test]
    fn test_array_parquet_round_trip() -> Result<()> {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("train.parquet");
        let arr = array![[0.5, -1.25, 1.0], [2.0, 0.1, 0.0]];
        let names = vec!["a".to_owned(), "b".to_owned(), "y".to_owned()];

        save_array(&arr, &names, &path)?;
        let (loaded, loaded_names) = load_array(&path)?;

        assert_eq!(loaded, arr);
        assert_eq!(loaded_names, names);
        Ok(())
    }

    #[test]
    fn test_save_array_rejects_name_mismatch() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let err = save_array(
            &array![[1.0, 2.0]],
            &["only".to_owned()],
            &tmp.path().join("x.parquet"),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::DataProcessing(_)));
        assert!(!tmp.path().join("x.parquet").exists());
    }

    #[test]
    fn test_list_files_sorted_and_skips_dirs() -> Result<()> {
        let tmp = tempfile::tempdir().expect("tempdir");
        std::fs::write(tmp.path().join("b.csv"), "x\n")?;
        std::fs::write(tmp.path().join("a.csv"), "x\n")?;
        std::fs::create_dir(tmp.path().join("sub"))?;

        let files = list_files(tmp.path())?;
        let names: Vec<_> = files
            .iter()
            .filter_map(|p| p.file_name()?.to_str())
            .collect();
        assert_eq!(names, ["a.csv", "b.csv"]);
        Ok(())
    }

    #[test]
    fn test_unsupported_extension() {
        let err = load_df(Path::new("data.xlsx")).unwrap_err();
        assert!(err.to_string().contains("xlsx"));
    }
}
