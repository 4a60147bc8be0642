//! Tabular I/O: value ranges of training data and dataset export.

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use polars::prelude::*;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use wmigen::api::{Dataset, Feature, FeatureKind};
use wmigen::relu::{input_var, output_var};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TableFormat {
    Csv,
    Parquet,
}

impl TableFormat {
    pub fn extension(self) -> &'static str {
        match self {
            TableFormat::Csv => "csv",
            TableFormat::Parquet => "parquet",
        }
    }
}

/// Min/max per real feature over a headerless CSV whose columns follow the
/// feature order. Non-numeric cells (e.g. `?`) are ignored.
pub fn real_ranges(path: &Path, features: &[Feature]) -> Result<BTreeMap<String, (f64, f64)>> {
    let df = LazyCsvReader::new(path)
        .with_has_header(false)
        .with_infer_schema_length(None)
        .finish()
        .with_context(|| format!("reading {}", path.display()))?
        .collect()?;
    if df.width() < features.len() {
        bail!(
            "{} has {} columns for {} features",
            path.display(),
            df.width(),
            features.len()
        );
    }
    let mut out = BTreeMap::new();
    for (feature, column) in features.iter().zip(df.get_columns()) {
        if feature.kind != FeatureKind::Real {
            continue;
        }
        let values = column.cast(&DataType::Float64)?;
        let values = values.f64()?;
        match (values.min(), values.max()) {
            (Some(lo), Some(hi)) => {
                out.insert(feature.name.clone(), (lo, hi));
            }
            _ => bail!("column of `{}` has no numeric values", feature.name),
        }
    }
    tracing::debug!(path = %path.display(), rows = df.height(), reals = out.len(), "training ranges");
    Ok(out)
}

/// `x_*` columns then `y_*` columns.
pub fn dataset_frame(ds: &Dataset) -> Result<DataFrame> {
    let mut columns = Vec::with_capacity(ds.x.ncols() + ds.y.ncols());
    for c in 0..ds.x.ncols() {
        let name = input_var(c);
        columns.push(Series::new(name.as_str().into(), ds.x.column(c).iter().copied().collect::<Vec<f64>>()));
    }
    for c in 0..ds.y.ncols() {
        let name = output_var(c);
        columns.push(Series::new(name.as_str().into(), ds.y.column(c).iter().copied().collect::<Vec<f64>>()));
    }
    Ok(DataFrame::new(columns)?)
}

pub fn write_frame(df: &mut DataFrame, path: &Path, format: TableFormat) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    match format {
        TableFormat::Csv => CsvWriter::new(&mut file).include_header(true).finish(df)?,
        TableFormat::Parquet => {
            ParquetWriter::new(&mut file).finish(df)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use wmigen::api::{parse_features, sample_split, setup, VerifyParams};

    #[test]
    fn ranges_follow_feature_order() {
        let dir = tempdir().unwrap();
        let data = dir.path().join("toy.train.data");
        std::fs::write(&data, "1.5,yes,2\n-0.5,no,?\n3.0,yes,7\n").unwrap();
        let feats = parse_features("a: continuous.\nb: no, yes.\nc: continuous.\n").unwrap();
        let ranges = real_ranges(&data, &feats).unwrap();
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges["a"], (-0.5, 3.0));
        assert_eq!(ranges["c"], (2.0, 7.0));
    }

    #[test]
    fn dataset_csv_has_input_then_output_columns() {
        let params = VerifyParams {
            xdim: 2,
            ydim: 1,
            ..VerifyParams::default()
        };
        let (prior, truth) = setup(&params).unwrap();
        let (train, _) = sample_split(&prior, &truth, 4, 1, params.seed).unwrap();
        let mut df = dataset_frame(&train).unwrap();
        assert_eq!(df.shape(), (4, 3));
        let dir = tempdir().unwrap();
        let path = dir.path().join("nn-train.csv");
        write_frame(&mut df, &path, TableFormat::Csv).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("x_0,x_1,y_0"));
        assert_eq!(lines.count(), 4);
    }
}
