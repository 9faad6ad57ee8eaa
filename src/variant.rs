use num_complex::Complex;

use crate::error::{KakshyaError, KakshyaResult};

pub type Complex32 = Complex<f32>;
pub type Complex64 = Complex<f64>;

/// A tagged container holding one of the scalar/complex sequence types
/// a container's raw or processed data can be made of.
#[derive(Debug, Clone, PartialEq)]
pub enum DataVariant {
    F64(Vec<f64>),
    F32(Vec<f32>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    Complex32(Vec<Complex32>),
    Complex64(Vec<Complex64>),
}

impl DataVariant {
    pub fn len(&self) -> usize {
        match self {
            DataVariant::F64(v) => v.len(),
            DataVariant::F32(v) => v.len(),
            DataVariant::U8(v) => v.len(),
            DataVariant::U16(v) => v.len(),
            DataVariant::U32(v) => v.len(),
            DataVariant::Complex32(v) => v.len(),
            DataVariant::Complex64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            DataVariant::F64(_) => "f64",
            DataVariant::F32(_) => "f32",
            DataVariant::U8(_) => "u8",
            DataVariant::U16(_) => "u16",
            DataVariant::U32(_) => "u32",
            DataVariant::Complex32(_) => "complex32",
            DataVariant::Complex64(_) => "complex64",
        }
    }

    /// Lossy projection to `f64`, used by transition blend math which
    /// operates over double spans regardless of source scalar type.
    pub fn as_f64_vec(&self) -> Vec<f64> {
        match self {
            DataVariant::F64(v) => v.clone(),
            DataVariant::F32(v) => v.iter().map(|x| *x as f64).collect(),
            DataVariant::U8(v) => v.iter().map(|x| *x as f64).collect(),
            DataVariant::U16(v) => v.iter().map(|x| *x as f64).collect(),
            DataVariant::U32(v) => v.iter().map(|x| *x as f64).collect(),
            DataVariant::Complex32(v) => v.iter().map(|x| x.re as f64).collect(),
            DataVariant::Complex64(v) => v.iter().map(|x| x.re).collect(),
        }
    }

    /// Builds a variant of the same scalar kind as `self` from an `f64`
    /// source span — the inverse of `as_f64_vec`, used to recover a
    /// container's declared type after region extraction or blend math
    /// that necessarily passes through `f64` internally.
    pub fn like_with_values(&self, values: Vec<f64>) -> DataVariant {
        match self {
            DataVariant::F64(_) => DataVariant::F64(values),
            DataVariant::F32(_) => DataVariant::F32(values.iter().map(|v| *v as f32).collect()),
            DataVariant::U8(_) => DataVariant::U8(values.iter().map(|v| *v as u8).collect()),
            DataVariant::U16(_) => DataVariant::U16(values.iter().map(|v| *v as u16).collect()),
            DataVariant::U32(_) => DataVariant::U32(values.iter().map(|v| *v as u32).collect()),
            DataVariant::Complex32(_) => {
                DataVariant::Complex32(values.iter().map(|v| Complex::new(*v as f32, 0.0)).collect())
            }
            DataVariant::Complex64(_) => {
                DataVariant::Complex64(values.iter().map(|v| Complex::new(*v, 0.0)).collect())
            }
        }
    }

    /// Writes values back from an `f64` source span, keeping the
    /// variant's own scalar type. Used after a blend to store the
    /// result back without changing the container's declared type.
    pub fn write_from_f64(&mut self, values: &[f64]) {
        match self {
            DataVariant::F64(v) => v.iter_mut().zip(values).for_each(|(d, s)| *d = *s),
            DataVariant::F32(v) => v.iter_mut().zip(values).for_each(|(d, s)| *d = *s as f32),
            DataVariant::U8(v) => v.iter_mut().zip(values).for_each(|(d, s)| *d = *s as u8),
            DataVariant::U16(v) => v.iter_mut().zip(values).for_each(|(d, s)| *d = *s as u16),
            DataVariant::U32(v) => v.iter_mut().zip(values).for_each(|(d, s)| *d = *s as u32),
            DataVariant::Complex32(v) => v
                .iter_mut()
                .zip(values)
                .for_each(|(d, s)| d.re = *s as f32),
            DataVariant::Complex64(v) => v.iter_mut().zip(values).for_each(|(d, s)| d.re = *s),
        }
    }
}

/// Copies `src` into `dest` in place, resizing `dest` to match. Fails
/// with `DataTypeMismatch` if the scalar types differ.
pub fn safe_copy_data_variant(src: &DataVariant, dest: &mut DataVariant) -> KakshyaResult<()> {
    match (src, dest) {
        (DataVariant::F64(s), DataVariant::F64(d)) => *d = s.clone(),
        (DataVariant::F32(s), DataVariant::F32(d)) => *d = s.clone(),
        (DataVariant::U8(s), DataVariant::U8(d)) => *d = s.clone(),
        (DataVariant::U16(s), DataVariant::U16(d)) => *d = s.clone(),
        (DataVariant::U32(s), DataVariant::U32(d)) => *d = s.clone(),
        (DataVariant::Complex32(s), DataVariant::Complex32(d)) => *d = s.clone(),
        (DataVariant::Complex64(s), DataVariant::Complex64(d)) => *d = s.clone(),
        (s, d) => {
            return Err(KakshyaError::DataTypeMismatch {
                expected: d.type_name(),
                found: s.type_name(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_matching_variants() {
        let src = DataVariant::F64(vec![1.0, 2.0, 3.0]);
        let mut dest = DataVariant::F64(vec![]);
        safe_copy_data_variant(&src, &mut dest).unwrap();
        assert_eq!(dest, DataVariant::F64(vec![1.0, 2.0, 3.0]));
    }

    #[test]
    fn copy_mismatched_variants_errors() {
        let src = DataVariant::F64(vec![1.0]);
        let mut dest = DataVariant::U8(vec![]);
        assert!(safe_copy_data_variant(&src, &mut dest).is_err());
    }

    #[test]
    fn like_with_values_preserves_the_source_variant_kind() {
        let template = DataVariant::U16(vec![0, 0, 0]);
        let rebuilt = template.like_with_values(vec![1.0, 2.0, 3.0]);
        assert_eq!(rebuilt, DataVariant::U16(vec![1, 2, 3]));
    }

    #[test]
    fn f64_roundtrip_preserves_scale() {
        let mut v = DataVariant::U8(vec![1, 2, 3]);
        let doubles = v.as_f64_vec();
        v.write_from_f64(&doubles);
        assert_eq!(v, DataVariant::U8(vec![1, 2, 3]));
    }
}
