//! utils — conversion helpers for the Python binding layer.
//!
//! Everything here turns loosely typed Python inputs (numpy arrays, pandas
//! objects, plain sequences, strings) into validated crate types, mapping
//! failures onto `PyErr` through the crate error conversions.
#[cfg(feature = "python-bindings")]
use ndarray::Array2;

#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::{
    data::{GrainSizeDataset, Sample, SizeClasses},
    optimization::minimizer::LineSearcher,
    ssu::{SsuError, SsuSetting},
    udm::{ComponentSharing, UdmSetting},
};

#[cfg(feature = "python-bindings")]
use numpy::{
    IntoPyArray,    // Vec → PyArray
    PyArrayMethods, // .readonly()
    PyReadonlyArray1,
    PyReadonlyArray2,
};

#[cfg(feature = "python-bindings")]
#[inline]
pub fn extract_f64_array<'py>(
    py: Python<'py>, raw_data: &Bound<'py, PyAny>,
) -> PyResult<PyReadonlyArray1<'py, f64>> {
    if let Ok(arr_ro) = raw_data.extract::<PyReadonlyArray1<f64>>()
        && arr_ro.as_slice().is_ok()
    {
        return Ok(arr_ro);
    }

    if let Ok(obj) = raw_data.call_method("to_numpy", (false,), None)
        && let Ok(series_ro) = obj.extract::<PyReadonlyArray1<f64>>()
        && series_ro.as_slice().is_ok()
    {
        return Ok(series_ro);
    }

    let vec: Vec<f64> = raw_data.extract().map_err(|_| {
        pyo3::exceptions::PyTypeError::new_err(
            "expected a 1-D numpy.ndarray, pandas.Series, or sequence of float64",
        )
    })?;
    Ok(vec.into_pyarray(py).readonly())
}

/// Copy a 1-D array-like into an owned vector; `what` names the argument in
/// error messages.
#[cfg(feature = "python-bindings")]
pub fn extract_f64_vec<'py>(
    py: Python<'py>, raw_data: &Bound<'py, PyAny>, what: &str,
) -> PyResult<Vec<f64>> {
    let arr = extract_f64_array(py, raw_data)?;
    let slice = arr.as_slice().map_err(|_| {
        PyValueError::new_err(format!("{what} must be a 1-D contiguous float64 array or sequence"))
    })?;
    Ok(slice.to_vec())
}

/// Copy a 2-D array-like (numpy array, DataFrame, or nested sequences)
/// into an owned matrix.
#[cfg(feature = "python-bindings")]
pub fn extract_f64_matrix<'py>(raw_data: &Bound<'py, PyAny>, what: &str) -> PyResult<Array2<f64>> {
    if let Ok(arr_ro) = raw_data.extract::<PyReadonlyArray2<f64>>() {
        return Ok(arr_ro.as_array().to_owned());
    }
    if let Ok(obj) = raw_data.call_method("to_numpy", (false,), None)
        && let Ok(frame_ro) = obj.extract::<PyReadonlyArray2<f64>>()
    {
        return Ok(frame_ro.as_array().to_owned());
    }
    let rows: Vec<Vec<f64>> = raw_data.extract().map_err(|_| {
        pyo3::exceptions::PyTypeError::new_err(format!(
            "{what} must be a 2-D numpy.ndarray, pandas.DataFrame, or nested sequence of float64"
        ))
    })?;
    let n_cols = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|r| r.len() != n_cols) {
        return Err(PyValueError::new_err(format!("{what} rows must all have the same length")));
    }
    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((flat.len() / n_cols.max(1), n_cols), flat)
        .map_err(|e| PyValueError::new_err(format!("{what}: {e}")))
}

/// Build a dataset from phi class values, an `S × C` distribution matrix
/// and optional sample names (`"S1"`, `"S2"`, … by default).
#[cfg(feature = "python-bindings")]
pub fn build_dataset<'py>(
    py: Python<'py>, classes_phi: &Bound<'py, PyAny>, distributions: &Bound<'py, PyAny>,
    names: Option<Vec<String>>,
) -> PyResult<GrainSizeDataset> {
    let classes = SizeClasses::from_phi(extract_f64_vec(py, classes_phi, "classes")?)?;
    let matrix = extract_f64_matrix(distributions, "distributions")?;
    let names = match names {
        Some(names) if names.len() != matrix.nrows() => {
            return Err(PyValueError::new_err(format!(
                "got {} names for {} samples",
                names.len(),
                matrix.nrows()
            )));
        }
        Some(names) => names,
        None => (1..=matrix.nrows()).map(|i| format!("S{i}")).collect(),
    };
    let samples = names
        .into_iter()
        .zip(matrix.rows())
        .map(|(name, row)| Sample::new(name, row.to_vec()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(GrainSizeDataset::new(classes, samples)?)
}

#[cfg(feature = "python-bindings")]
#[allow(clippy::too_many_arguments)]
pub fn build_ssu_setting(
    global_maxiter: Option<usize>, global_patience: Option<usize>, final_tolerance: Option<f64>,
    final_maxiter: Option<usize>, minimizer_tolerance: Option<f64>,
    minimizer_maxiter: Option<usize>, step_size: Option<f64>, temperature: Option<f64>,
    seed: Option<u64>, line_searcher: Option<&str>, record_trace: Option<bool>,
) -> PyResult<SsuSetting> {
    use std::str::FromStr;

    let d = SsuSetting::default();
    let line_searcher = match line_searcher {
        Some(name) => LineSearcher::from_str(name).map_err(SsuError::from)?,
        None => d.line_searcher,
    };
    let setting = SsuSetting {
        global_maxiter: global_maxiter.unwrap_or(d.global_maxiter),
        global_patience: global_patience.unwrap_or(d.global_patience),
        final_tolerance: final_tolerance.unwrap_or(d.final_tolerance),
        final_maxiter: final_maxiter.unwrap_or(d.final_maxiter),
        minimizer_tolerance: minimizer_tolerance.unwrap_or(d.minimizer_tolerance),
        minimizer_maxiter: minimizer_maxiter.unwrap_or(d.minimizer_maxiter),
        step_size: step_size.unwrap_or(d.step_size),
        temperature: temperature.unwrap_or(d.temperature),
        seed: seed.unwrap_or(d.seed),
        line_searcher,
        record_trace: record_trace.unwrap_or(d.record_trace),
        verbose: false,
    };
    setting.validate().map_err(SsuError::from)?;
    Ok(setting)
}

#[cfg(feature = "python-bindings")]
#[allow(clippy::too_many_arguments)]
pub fn build_udm_setting(
    pretrain_epochs: Option<usize>, min_epochs: Option<usize>, max_epochs: Option<usize>,
    precision: Option<f64>, learning_rate: Option<f64>, betas: Option<(f64, f64)>,
    constraint_level: Option<f64>, sharing: Option<&str>, history_stride: Option<usize>,
) -> PyResult<UdmSetting> {
    let d = UdmSetting::default();
    let sharing = match sharing {
        Some(name) => name.parse::<ComponentSharing>()?,
        None => d.sharing,
    };
    let setting = UdmSetting {
        pretrain_epochs: pretrain_epochs.unwrap_or(d.pretrain_epochs),
        min_epochs: min_epochs.unwrap_or(d.min_epochs),
        max_epochs: max_epochs.unwrap_or(d.max_epochs),
        precision: precision.unwrap_or(d.precision),
        learning_rate: learning_rate.unwrap_or(d.learning_rate),
        betas: betas.unwrap_or(d.betas),
        constraint_level: constraint_level.unwrap_or(d.constraint_level),
        sharing,
        history_stride: history_stride.unwrap_or(d.history_stride),
    };
    setting.validate()?;
    Ok(setting)
}
