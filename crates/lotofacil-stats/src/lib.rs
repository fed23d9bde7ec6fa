//! Small statistical toolkit shared by the detector and the optimizer.
//!
//! - [`descriptive`]: mean, spread and extrema of a sample, z-scores and
//!   correlation
//! - [`percentiles`]: nearest-rank percentiles and two-sided quantile bands
//!
//! # Examples
//!
//! ```
//! use lotofacil_stats::descriptive::DescriptiveStats;
//!
//! let stats = DescriptiveStats::new([1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
//! assert_eq!(stats.mean, 3.0);
//! ```
//!
//! ```
//! use lotofacil_stats::percentiles::QuantileBand;
//!
//! let values: Vec<f32> = (0..=40).map(|v| v as f32).collect();
//! let band = QuantileBand::new(&values, 2.5, 97.5).unwrap();
//! assert_eq!(band.lower, 1.0);
//! assert_eq!(band.upper, 39.0);
//! ```

pub mod descriptive;
pub mod percentiles;
