//! DataFrame <-> ndarray conversion

use crate::error::{EnergyError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;

/// Collect `columns` of `df` into a row-major f64 matrix.
/// Nulls are rejected rather than silently filled.
pub fn frame_to_matrix(df: &DataFrame, columns: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();

    let col_data: Vec<Vec<f64>> = columns
        .iter()
        .map(|name| {
            let column = df
                .column(name)
                .map_err(|_| EnergyError::schema(name.as_str(), "is missing from the feature table"))?;
            let casted = column.as_materialized_series().cast(&DataType::Float64)?;
            casted
                .f64()?
                .into_iter()
                .map(|v| {
                    v.ok_or_else(|| {
                        EnergyError::DataIntegrity(format!("null value in feature column '{}'", name))
                    })
                })
                .collect::<Result<Vec<f64>>>()
        })
        .collect::<Result<Vec<Vec<f64>>>>()?;

    Ok(Array2::from_shape_fn((n_rows, columns.len()), |(r, c)| col_data[c][r]))
}

/// Single-column frame holding a target vector
pub fn targets_to_frame(name: &str, targets: &Array1<f64>) -> Result<DataFrame> {
    let column = Column::new(name.into(), targets.to_vec());
    Ok(DataFrame::new(vec![column])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_frame_to_matrix_order() {
        let df = df!("a" => &[1.0, 2.0], "b" => &[3i64, 4]).unwrap();
        let m = frame_to_matrix(&df, &["b".to_string(), "a".to_string()]).unwrap();
        assert_eq!(m, array![[3.0, 1.0], [4.0, 2.0]]);
    }

    #[test]
    fn test_frame_to_matrix_rejects_nulls() {
        let df = df!("a" => &[Some(1.0), None]).unwrap();
        assert!(frame_to_matrix(&df, &["a".to_string()]).is_err());
    }

    #[test]
    fn test_targets_to_frame() {
        let df = targets_to_frame("elec_cons", &array![1.0, 2.0, 3.0]).unwrap();
        assert_eq!(df.shape(), (3, 1));
    }
}
